//! Registry of command waiters keyed by `requestSerial`, resolved by the
//! push listener when a matching `remoteControl` result arrives.
//! `requestSerial` is server-assigned and already unique per command
//! attempt (see the glossary), so it is the whole key: the wire payload
//! for a `remoteControl` push (spec §8 scenario 3) carries no `vin` or
//! `commandType` to cross-check against. Single-assignment: the first
//! resolution wins, matching the "command waiters are single-assignment"
//! ordering guarantee.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{oneshot, Mutex};

/// What a waiter is told when its command resolves via the push path.
#[derive(Debug, Clone)]
pub struct PushResolution {
    pub control_state: Option<i64>,
    pub data: Value,
}

struct Entry {
    sender: oneshot::Sender<PushResolution>,
}

/// Bounded by construction: one entry per in-flight command attempt,
/// removed on resolution or by the orchestrator on timeout/cancel.
#[derive(Clone, Default)]
pub struct WaiterRegistry {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `request_serial` and returns the receiver
    /// half. Replaces (and drops) any waiter already registered for this
    /// serial, which should not happen in practice — serials are
    /// server-assigned and unique per command attempt.
    pub async fn register(&self, request_serial: &str) -> oneshot::Receiver<PushResolution> {
        let (tx, rx) = oneshot::channel();
        let entry = Entry { sender: tx };
        self.entries
            .lock()
            .await
            .insert(request_serial.to_string(), entry);
        rx
    }

    /// Removes and signals a waiter if one is registered for
    /// `request_serial`.
    pub async fn resolve(&self, request_serial: &str, control_state: Option<i64>, data: Value) -> bool {
        let entry = self.entries.lock().await.remove(request_serial);
        match entry {
            Some(entry) => {
                let _ = entry.sender.send(PushResolution { control_state, data });
                true
            }
            None => false,
        }
    }

    /// Removes a waiter without resolving it, e.g. when the orchestrator
    /// gives up and falls back to polling.
    pub async fn cancel(&self, request_serial: &str) {
        self.entries.lock().await.remove(request_serial);
    }

    #[cfg(test)]
    async fn registered_for(&self, request_serial: &str) -> Option<()> {
        self.entries
            .lock()
            .await
            .get(request_serial)
            .map(|_| ())
    }
}
