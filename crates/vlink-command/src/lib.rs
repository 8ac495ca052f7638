//! Command orchestrator (C9): trigger, MQTT-fast-path/HTTP-poll-fallback
//! race, retries, optimistic overlays, and the terminal PIN-lockout rule.

pub mod overlay;
pub mod permission;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use serde_json::{Map, Value};
use thiserror::Error;

use vlink_push::waiters::WaiterRegistry;
use vlink_session::SessionHolder;
use vlink_state::StateStore;
use vlink_transport::{KeyMaterial, SecureTransport, TransportError};
use vlink_types::{
    now_epoch_ms, CommandAttempt, CommandCode, CommandOutcome, Config, CoreError, Mechanism, Vin,
};

pub use permission::PermissionProfile;

const TRIGGER_ENDPOINT: &str = "control/remoteControl";
const POLL_ENDPOINT: &str = "control/remoteControlResult";
const RATE_LIMIT_BACKOFF_MS: [u64; 3] = [1_000, 2_000, 4_000];
const RATE_LIMIT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, CommandError>;

pub struct CommandOrchestrator {
    transport: Arc<SecureTransport>,
    session: SessionHolder,
    waiters: WaiterRegistry,
    state: Arc<StateStore>,
    config: Config,
    pin_locked: Arc<AtomicBool>,
    permissions: permission::PermissionRegistry,
    /// Completed/in-flight attempts keyed by trigger serial, retained for
    /// introspection (`attempt`). Not used for resolution — that's the
    /// waiter registry's job — only for observing outcomes after the
    /// fact.
    attempts: Mutex<HashMap<String, CommandAttempt>>,
}

impl CommandOrchestrator {
    pub fn new(
        transport: Arc<SecureTransport>,
        session: SessionHolder,
        waiters: WaiterRegistry,
        state: Arc<StateStore>,
        config: Config,
    ) -> Self {
        Self {
            transport,
            session,
            waiters,
            state,
            config,
            pin_locked: Arc::new(AtomicBool::new(false)),
            permissions: permission::PermissionRegistry::new(),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the last known state of the attempt identified by its
    /// trigger serial, if one was ever recorded.
    pub async fn attempt(&self, request_serial: &str) -> Option<CommandAttempt> {
        self.attempts.lock().await.get(request_serial).cloned()
    }

    /// Records the permission profile the core observed for `vin`
    /// (populated from the account/vehicle-list response). Unknown VINs
    /// default to [`PermissionProfile::Full`] — see DESIGN.md for the
    /// rationale.
    pub async fn set_permission_profile(&self, vin: Vin, profile: PermissionProfile) {
        self.permissions.set(vin, profile).await;
    }

    /// `execute(vin, code, params)`: the full §4.9 algorithm.
    pub async fn execute(&self, vin: Vin, code: CommandCode, params: Option<Value>) -> Result<CommandOutcome> {
        if self.pin_locked.load(Ordering::SeqCst) {
            return Err(CoreError::ControlPasswordLocked.into());
        }

        if !self.permissions.supports(&vin, code).await {
            return Err(CoreError::EndpointNotSupported.into());
        }

        let mut attempt = CommandAttempt::new(
            vin.clone(),
            code,
            params.clone(),
            String::new(),
            now_epoch_ms(),
            now_epoch_ms() + self.config.mqtt_timeout().as_millis() as u64
                + self.config.poll_interval().as_millis() as u64 * self.config.poll_attempts as u64,
        );

        let trigger_data = match self.trigger_with_retry(&vin, code, params.as_ref()).await {
            Ok(data) => data,
            Err(e) if matches!(
                e,
                CommandError::Transport(TransportError::Core(
                    CoreError::ControlPasswordLocked | CoreError::ControlPasswordWrong
                )) | CommandError::Core(CoreError::ControlPasswordLocked | CoreError::ControlPasswordWrong)
            ) =>
            {
                self.pin_locked.store(true, Ordering::SeqCst);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let request_serial = trigger_data
            .get("requestSerial")
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::ApiError {
                code: -1,
                endpoint: TRIGGER_ENDPOINT.to_string(),
                message: "trigger response missing requestSerial".to_string(),
            })?
            .to_string();
        attempt.trigger_serial = request_serial.clone();
        self.record_attempt(attempt.clone()).await;

        // Immediate success: controlState=1 or res=2 already present.
        if is_success_signal(&trigger_data) {
            attempt.outcome = CommandOutcome::Success;
            self.record_attempt(attempt.clone()).await;
            self.apply_overlay(&vin, code, params.as_ref()).await;
            return Ok(CommandOutcome::Success);
        }

        let rx = self.waiters.register(&request_serial).await;

        let resolved = tokio::select! {
            resolution = rx => resolution.ok(),
            _ = tokio::time::sleep(self.config.mqtt_timeout()) => None,
        };

        let outcome = match resolved {
            Some(resolution) => {
                attempt.mechanism = Some(Mechanism::Mqtt);
                classify_control_state(resolution.control_state)
            }
            None => {
                self.waiters.cancel(&request_serial).await;
                attempt.mechanism = Some(Mechanism::Poll);
                self.poll_for_result(&vin, &request_serial).await?
            }
        };

        attempt.outcome = outcome;
        self.record_attempt(attempt.clone()).await;
        match outcome {
            CommandOutcome::Success => {
                self.apply_overlay(&vin, code, params.as_ref()).await;
                Ok(CommandOutcome::Success)
            }
            CommandOutcome::Failure => Err(CoreError::RemoteControlFailure.into()),
            CommandOutcome::Timeout => Err(CoreError::Timeout.into()),
            CommandOutcome::Pending | CommandOutcome::Cancelled => Ok(outcome),
        }
    }

    async fn record_attempt(&self, attempt: CommandAttempt) {
        self.attempts
            .lock()
            .await
            .insert(attempt.trigger_serial.clone(), attempt);
    }

    async fn trigger_with_retry(&self, vin: &Vin, code: CommandCode, params: Option<&Value>) -> Result<Value> {
        let mut retries = 0;
        loop {
            let result = self.trigger_once(vin, code, params).await;
            match result {
                Err(CommandError::Transport(TransportError::Core(CoreError::RateLimited))) => {
                    if retries >= RATE_LIMIT_MAX_RETRIES {
                        return Err(CoreError::EndpointNotSupported.into());
                    }
                    tokio::time::sleep(Duration::from_millis(RATE_LIMIT_BACKOFF_MS[retries as usize])).await;
                    retries += 1;
                }
                other => return other,
            }
        }
    }

    async fn trigger_once(&self, vin: &Vin, code: CommandCode, params: Option<&Value>) -> Result<Value> {
        let session = self.session.current().await.ok_or(CoreError::SessionRequired)?;
        let pin_md5 = format!("{:X}", md5::compute(self.config.control_pin.as_bytes()));

        let mut inner = Map::new();
        inner.insert("vin".to_string(), Value::from(vin.as_str()));
        inner.insert("commandType".to_string(), Value::from(code.wire_command_type()));
        inner.insert("commandPwd".to_string(), Value::from(pin_md5));
        if let Some(p) = params {
            inner.insert("controlParamsMap".to_string(), Value::from(p.to_string()));
        }

        let key_material = KeyMaterial::Session {
            content_key: session.content_key_bytes(),
            sign_key: session.sign_key.clone(),
        };
        let parsed = self
            .transport
            .post_secure(TRIGGER_ENDPOINT, inner, key_material, true)
            .await?;
        Ok(parsed.data.unwrap_or(Value::Null))
    }

    async fn poll_for_result(&self, vin: &Vin, request_serial: &str) -> Result<CommandOutcome> {
        for _ in 0..self.config.poll_attempts {
            tokio::time::sleep(self.config.poll_interval()).await;

            let session = self.session.current().await.ok_or(CoreError::SessionRequired)?;
            let mut inner = Map::new();
            inner.insert("vin".to_string(), Value::from(vin.as_str()));
            inner.insert("requestSerial".to_string(), Value::from(request_serial));
            let key_material = KeyMaterial::Session {
                content_key: session.content_key_bytes(),
                sign_key: session.sign_key.clone(),
            };
            let parsed = self
                .transport
                .post_secure(POLL_ENDPOINT, inner, key_material, true)
                .await?;
            let data = parsed.data.unwrap_or(Value::Null);
            let control_state = data.get("controlState").and_then(Value::as_i64);
            if matches!(control_state, Some(1) | Some(2)) {
                return Ok(classify_control_state(control_state));
            }
        }
        Ok(CommandOutcome::Timeout)
    }

    async fn apply_overlay(&self, vin: &Vin, code: CommandCode, params: Option<&Value>) {
        for (section, fields) in overlay::overlay_fields(code, params) {
            self.state
                .overlay(vin, section, fields, overlay::OVERLAY_TTL_MS)
                .await;
        }
    }
}

fn classify_control_state(control_state: Option<i64>) -> CommandOutcome {
    match control_state {
        Some(1) => CommandOutcome::Success,
        Some(2) => CommandOutcome::Failure,
        _ => CommandOutcome::Timeout,
    }
}

fn is_success_signal(data: &Value) -> bool {
    let control_state = data.get("controlState").and_then(Value::as_i64);
    let res = data.get("res").and_then(Value::as_i64);
    matches!(control_state, Some(1)) || matches!(res, Some(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_success_recognizes_control_state_one() {
        assert!(is_success_signal(&serde_json::json!({"controlState": 1})));
    }

    #[test]
    fn immediate_success_recognizes_res_two() {
        assert!(is_success_signal(&serde_json::json!({"res": 2})));
    }

    #[test]
    fn pending_trigger_is_not_an_immediate_success() {
        assert!(!is_success_signal(&serde_json::json!({"controlState": 0})));
    }

    #[test]
    fn classify_maps_one_and_two_and_else() {
        assert_eq!(classify_control_state(Some(1)), CommandOutcome::Success);
        assert_eq!(classify_control_state(Some(2)), CommandOutcome::Failure);
        assert_eq!(classify_control_state(None), CommandOutcome::Timeout);
    }
}
