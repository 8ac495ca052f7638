//! Assembly crate: owns one instance of every collaborator crate and
//! exposes the per-endpoint core API the (out-of-scope) façade calls.
//! Mirrors how the teacher's `ochra-daemon` builds one `DaemonState` and
//! hands it to every RPC handler, except there is no RPC boundary here
//! — callers hold a `Core` directly and await its methods.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use vlink_adapters::{AdapterContext, AdapterError};
use vlink_command::{CommandError, CommandOrchestrator, PermissionProfile};
use vlink_push::listener::{BrokerAddress, PushListener};
use vlink_push::waiters::WaiterRegistry;
use vlink_push::PushEvent;
use vlink_session::SessionHolder;
use vlink_state::StateStore;
use vlink_transport::SecureTransport;
use vlink_types::{
    now_epoch_ms, CommandCode, CommandOutcome, Config, CoreError, FieldOrigin, Section,
    SectionEvent, SectionSnapshot, Vin,
};

pub use vlink_adapters::vehicles::VehicleSummary;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("mqtt client error: {0}")]
    Mqtt(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// One core instance: a session, a state store, a secure transport, a
/// command orchestrator, and the adapter context binding them together.
/// Instance-scoped throughout, matching the "no process globals" design
/// note — build as many `Core`s as there are logical accounts.
pub struct Core {
    config: Config,
    transport: Arc<SecureTransport>,
    session: SessionHolder,
    state: Arc<StateStore>,
    waiters: WaiterRegistry,
    orchestrator: Arc<CommandOrchestrator>,
    adapters: AdapterContext,
}

impl Core {
    pub fn new(config: Config) -> Result<Self> {
        let session = SessionHolder::new();
        let transport = Arc::new(SecureTransport::new(config.clone(), session.clone())?);
        let state = Arc::new(StateStore::new());
        let waiters = WaiterRegistry::new();
        let orchestrator = Arc::new(CommandOrchestrator::new(
            transport.clone(),
            session.clone(),
            waiters.clone(),
            state.clone(),
            config.clone(),
        ));
        let adapters = AdapterContext::new(transport.clone(), session.clone(), state.clone());

        Ok(Self {
            config,
            transport,
            session,
            state,
            waiters,
            orchestrator,
            adapters,
        })
    }

    /// Authenticates and installs the returned session. Call this again
    /// after a `SessionExpired` is observed (spec.md §8 scenario 6) —
    /// the core never re-authenticates on its own.
    pub async fn login(&self) -> Result<()> {
        let session = vlink_adapters::auth::login(&self.transport, &self.config).await?;
        self.session.replace(session).await;
        Ok(())
    }

    /// Fetches the account's vehicle list and records each vehicle's
    /// observed permission profile with the command orchestrator.
    pub async fn vehicles(&self) -> Result<Vec<VehicleSummary>> {
        let vehicles = vlink_adapters::vehicles::get_all_vehicles(&self.adapters).await?;
        for vehicle in &vehicles {
            let profile = if vehicle.basic_control_only {
                PermissionProfile::Basic
            } else {
                PermissionProfile::Full
            };
            self.orchestrator.set_permission_profile(vehicle.vin.clone(), profile).await;
        }
        Ok(vehicles)
    }

    pub async fn refresh_realtime(&self, vin: &Vin) -> Result<()> {
        vlink_adapters::realtime::refresh_realtime(&self.adapters, vin, self.config.poll_attempts, self.config.poll_interval())
            .await
            .map_err(Into::into)
    }

    pub async fn get_status_now(&self, vin: &Vin) -> Result<()> {
        vlink_adapters::realtime::get_status_now(&self.adapters, vin).await.map_err(Into::into)
    }

    pub async fn refresh_gps(&self, vin: &Vin) -> Result<()> {
        vlink_adapters::gps::refresh_gps(&self.adapters, vin, self.config.poll_attempts, self.config.poll_interval())
            .await
            .map_err(Into::into)
    }

    pub async fn refresh_charging(&self, vin: &Vin) -> Result<()> {
        vlink_adapters::charging::refresh_charging(&self.adapters, vin).await.map_err(Into::into)
    }

    pub async fn refresh_energy_consumption(&self, vin: &Vin) -> Result<()> {
        vlink_adapters::energy::refresh_energy_consumption(&self.adapters, vin).await.map_err(Into::into)
    }

    pub async fn verify_control_password(&self, pin_md5_upper: &str) -> Result<()> {
        vlink_adapters::password::verify_control_password(&self.adapters, pin_md5_upper)
            .await
            .map_err(Into::into)
    }

    /// `execute(vin, code, params)`: the full command orchestration
    /// algorithm (trigger, MQTT/poll race, PIN lockout, overlays).
    pub async fn execute_command(&self, vin: Vin, code: CommandCode, params: Option<Value>) -> Result<CommandOutcome> {
        self.orchestrator.execute(vin, code, params).await.map_err(Into::into)
    }

    pub async fn get_section(&self, vin: &Vin, section: Section) -> SectionSnapshot {
        self.state.get_section(vin, section).await
    }

    /// Discovers the MQTT broker, opens the TLS connection, and spawns
    /// the event loop plus a dispatch task feeding vehicle telemetry
    /// into the state store and command results into the waiter
    /// registry. A no-op if MQTT is disabled in config. Requires a
    /// session to already be installed (`login()` first).
    pub async fn connect_push(&self) -> Result<()> {
        if !self.config.mqtt_enabled {
            return Ok(());
        }
        let session = self.session.current().await.ok_or(CoreError::SessionRequired)?;
        let broker: BrokerAddress = vlink_adapters::broker::discover_broker(&self.adapters).await?;
        let client_id = format!("vlink-{}", session.user_id);

        let keepalive = std::time::Duration::from_secs(self.config.mqtt_keepalive_secs);
        let (listener, eventloop) = PushListener::connect(broker, &session.user_id, keepalive, &client_id);
        listener
            .subscribe(&session.user_id)
            .await
            .map_err(|e| ClientError::Mqtt(e.to_string()))?;

        let client = listener.client_handle();
        let user_id = session.user_id.clone();
        let state = self.state.clone();
        let waiters = self.waiters.clone();
        let session_holder = self.session.clone();

        tokio::spawn(async move {
            PushListener::run(eventloop, client, user_id, move || session_holder.try_content_key(), move |event| {
                dispatch_push_event(state.clone(), waiters.clone(), event);
            })
            .await;
        });

        Ok(())
    }
}

/// Fields carried on a `vehicleInfo` push message that describe routing,
/// not telemetry — dropped the same way the REST adapters drop their
/// meta fields.
const PUSH_META_FIELDS: &[&str] = &["vin", "time"];

/// Routes one decoded push event to the state store or the waiter
/// registry. Runs inside a dedicated task per event so the synchronous
/// `on_event` callback never blocks the MQTT event loop on a lock.
fn dispatch_push_event(state: Arc<StateStore>, waiters: WaiterRegistry, event: PushEvent) {
    match event {
        PushEvent::VehicleInfo { vin, data } => {
            let Some(vin) = vin else {
                debug!("vehicleInfo push event missing vin, dropping");
                return;
            };
            tokio::spawn(async move {
                let Some(obj) = data.as_object() else {
                    debug!("vehicleInfo push payload was not an object, dropping");
                    return;
                };
                let observed_at = obj
                    .get("time")
                    .and_then(Value::as_u64)
                    .map(|secs| secs * 1000)
                    .unwrap_or_else(now_epoch_ms);
                let fields = obj
                    .iter()
                    .filter(|(k, _)| !PUSH_META_FIELDS.contains(&k.as_str()))
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                state
                    .apply(SectionEvent {
                        vin: Vin::new(vin),
                        section: Section::Realtime,
                        origin: FieldOrigin::Push,
                        observed_at,
                        fields,
                    })
                    .await;
            });
        }
        PushEvent::RemoteControl {
            request_serial,
            control_state,
            data,
        } => {
            tokio::spawn(async move {
                waiters.resolve(&request_serial, control_state, data).await;
            });
        }
        PushEvent::Unknown { envelope_type } => {
            warn!(envelope_type, "dropping push envelope of unrecognized type");
        }
    }
}
