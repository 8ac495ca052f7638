use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::DeviceIdentity;

/// Everything the core needs to operate, already parsed. Loading this
/// from environment variables or a file is the façade's responsibility;
/// the core only ever consumes an already-populated `Config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub control_pin: String,
    pub country_code: String,
    pub language: String,
    pub mqtt_enabled: bool,
    pub mqtt_keepalive_secs: u64,
    pub mqtt_timeout_secs: u64,
    pub session_ttl_seconds: u64,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub device_identity: DeviceIdentity,
}

impl Config {
    pub fn mqtt_timeout(&self) -> Duration {
        Duration::from_secs(self.mqtt_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}
