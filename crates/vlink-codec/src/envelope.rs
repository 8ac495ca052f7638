use serde::{Deserialize, Serialize};
use serde_json::Value;

use vlink_types::DeviceIdentity;

/// Fixed outer `ostype` value.
pub const OS_TYPE: &str = "android";
/// Fixed standard inner `deviceType` value.
pub const DEVICE_TYPE: &str = "1";
/// Fixed standard inner `networkType` value.
pub const NETWORK_TYPE: &str = "WIFI";
/// Fixed standard inner `version` value.
pub const PROTOCOL_VERSION: &str = "5.0.0";

/// The outer envelope, serialized to plaintext JSON and then passed
/// through the white-box codec before being wrapped as
/// `{"request": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OuterEnvelope {
    #[serde(rename = "countryCode")]
    pub country_code: String,
    pub identifier: String,
    #[serde(rename = "imeiMD5")]
    pub imei_md5: String,
    pub language: String,
    #[serde(rename = "reqTimestamp")]
    pub req_timestamp: u64,
    pub ostype: String,
    pub imei: String,
    pub mac: String,
    pub model: String,
    pub sdk: String,
    #[serde(rename = "mod")]
    pub modification: String,
    #[serde(rename = "serviceTime")]
    pub service_time: u64,
    pub sign: String,
    pub checkcode: String,
    #[serde(rename = "encryData")]
    pub encry_data: String,
}

impl OuterEnvelope {
    pub fn from_device(device: &DeviceIdentity) -> PartialOuter {
        PartialOuter {
            ostype: OS_TYPE.to_string(),
            imei: device.imei.clone(),
            mac: device.mac.clone(),
            model: device.model.clone(),
            sdk: device.sdk.clone(),
            modification: device.modification.clone(),
        }
    }
}

/// The device-sourced subset of outer fields, kept separate so
/// `request::build_request` can fill in the per-call fields (timestamps,
/// sign, checkcode, encryData) without re-threading device identity
/// through every call site.
pub struct PartialOuter {
    pub ostype: String,
    pub imei: String,
    pub mac: String,
    pub model: String,
    pub sdk: String,
    pub modification: String,
}

/// Convert a JSON value into the "raw string value" the signer
/// concatenates, per the signer's "no URL-encoding" rule.
pub fn raw_string_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
