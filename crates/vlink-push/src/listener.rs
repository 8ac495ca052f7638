//! The network-facing half of C7: owns the `rumqttc` client/event loop
//! pair and drives reconnects. Decode/dispatch is delegated to
//! [`crate::dispatch_push_payload`] so this module stays untestable-only
//! for the parts that genuinely require a broker.

use std::time::Duration;

use rand::Rng;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS, Transport};
use tracing::{debug, warn};

use crate::{dispatch_push_payload, topic_for_user, PushEvent};

/// Result of the broker-discovery endpoint (`app/emqAuth/getEmqBrokerIp`),
/// handed in by the caller — C7 itself never calls C6.
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

pub struct PushListener {
    client: AsyncClient,
}

impl PushListener {
    /// Opens the TLS MQTT connection. Returns the listener handle and the
    /// event loop, which the caller drives with [`PushListener::run`] in
    /// a dedicated task.
    pub fn connect(broker: BrokerAddress, user_id: &str, keepalive: Duration, client_id: &str) -> (Self, rumqttc::EventLoop) {
        let mut options = MqttOptions::new(client_id, broker.host, broker.port);
        options.set_keep_alive(keepalive);
        options.set_transport(Transport::tls_with_default_config());
        options.set_credentials(user_id, "");
        let (client, eventloop) = AsyncClient::new(options, 64);
        (Self { client }, eventloop)
    }

    pub async fn subscribe(&self, user_id: &str) -> std::result::Result<(), rumqttc::ClientError> {
        self.client
            .subscribe(topic_for_user(user_id), QoS::AtLeastOnce)
            .await
    }

    /// A cheaply-cloneable handle to the underlying MQTT client, for the
    /// caller to pass into [`PushListener::run`] alongside the event
    /// loop it was paired with at [`PushListener::connect`].
    pub fn client_handle(&self) -> AsyncClient {
        self.client.clone()
    }

    /// Drives the event loop until the caller drops it. Malformed
    /// messages are logged and dropped, never fatal. Connection errors
    /// trigger a reconnect with exponential backoff (1s..60s, full
    /// jitter); rumqttc reconnects the underlying socket itself, this
    /// loop re-subscribes once the new `ConnAck` arrives.
    pub async fn run<F, C>(
        mut eventloop: rumqttc::EventLoop,
        client: AsyncClient,
        user_id: String,
        content_key: C,
        mut on_event: F,
    ) where
        F: FnMut(PushEvent) + Send,
        C: Fn() -> Option<Vec<u8>> + Send,
    {
        let mut attempt: u32 = 0;
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    attempt = 0;
                    let Some(key) = content_key() else {
                        debug!("push message dropped: no session held");
                        continue;
                    };
                    match dispatch_push_payload(&publish.payload, &key) {
                        Ok(event) => on_event(event),
                        Err(e) => debug!(error = %e, "dropping malformed push envelope"),
                    }
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    attempt = 0;
                    if let Err(e) = client.subscribe(topic_for_user(&user_id), QoS::AtLeastOnce).await {
                        warn!(error = %e, "re-subscribe after reconnect failed");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let delay = reconnect_delay(attempt);
                    warn!(error = %e, attempt, ?delay, "mqtt event loop error, reconnecting");
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }
}

/// Full-jitter backoff: uniform random in `[0, min(cap, base * 2^attempt)]`.
fn reconnect_delay(attempt: u32) -> Duration {
    let cap = Duration::from_secs(60);
    let base = Duration::from_secs(1);
    let backoff = base.saturating_mul(1u32 << attempt.min(6)).min(cap);
    let jitter_ms = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64);
    Duration::from_millis(jitter_ms)
}
