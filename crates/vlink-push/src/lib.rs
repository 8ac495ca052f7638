//! Push listener (C7): TLS MQTT ingestion of vendor telemetry and
//! command results.
//!
//! The network loop (`listener::PushListener::run`) and the
//! decode/dispatch logic (`dispatch_push_payload`) are kept separate on
//! purpose — there is no broker available in this environment, so
//! everything testable here is tested as a pure function.

pub mod listener;
pub mod waiters;

use serde_json::Value;
use thiserror::Error;

use vlink_crypto::{inner_aes, whitebox};

/// The push topic is `oversea/res/<userId>`.
pub fn topic_for_user(user_id: &str) -> String {
    format!("oversea/res/{user_id}")
}

#[derive(Debug, Error)]
pub enum PushError {
    #[error(transparent)]
    Crypto(#[from] vlink_crypto::CryptoError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

pub type Result<T> = std::result::Result<T, PushError>;

/// A decoded push message, classified per envelope type.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// `vehicleInfo`: realtime telemetry, merged straight into the
    /// `realtime` section by the caller.
    VehicleInfo { vin: Option<String>, data: Value },
    /// `remoteControl`: a command result, resolved against the waiter
    /// registry by `(requestSerial)`.
    RemoteControl {
        request_serial: String,
        control_state: Option<i64>,
        data: Value,
    },
    /// Any envelope type this core doesn't know about. Logged at debug
    /// and dropped by the caller, never fatal to the listener.
    Unknown { envelope_type: String },
}

/// Decode one raw MQTT message body into a [`PushEvent`]. Pure function:
/// no network, no state, so it is testable without a broker. Malformed
/// input returns an error; the caller logs and drops it rather than
/// letting one bad message kill the listener task.
pub fn dispatch_push_payload(body: &[u8], content_key: &[u8]) -> Result<PushEvent> {
    let decoded = whitebox::decode(body)?;
    let outer: Value = serde_json::from_slice(&decoded)?;

    let envelope_type = outer
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| PushError::Malformed("missing `type` field".to_string()))?
        .to_string();

    let respond_data = outer
        .pointer("/payload/data/respondData")
        .and_then(Value::as_str)
        .unwrap_or("");

    let data = if respond_data.is_empty() {
        Value::Null
    } else {
        let plaintext = inner_aes::decrypt_hex(content_key, respond_data)?;
        serde_json::from_slice(&plaintext)?
    };

    match envelope_type.as_str() {
        "vehicleInfo" => Ok(PushEvent::VehicleInfo {
            vin: data.get("vin").and_then(Value::as_str).map(str::to_string),
            data,
        }),
        "remoteControl" => {
            let request_serial = data
                .get("requestSerial")
                .and_then(Value::as_str)
                .ok_or_else(|| PushError::Malformed("remoteControl missing requestSerial".to_string()))?
                .to_string();
            let control_state = data.get("controlState").and_then(Value::as_i64);
            Ok(PushEvent::RemoteControl {
                request_serial,
                control_state,
                data,
            })
        }
        other => Ok(PushEvent::Unknown {
            envelope_type: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build_message(envelope_type: &str, data: Option<&Value>, content_key: &[u8]) -> Vec<u8> {
        let respond_data = match data {
            Some(v) => inner_aes::encrypt_hex(content_key, v.to_string().as_bytes()).expect("encrypt"),
            None => String::new(),
        };
        let outer = json!({
            "type": envelope_type,
            "payload": { "data": { "respondData": respond_data } },
        });
        whitebox::encode(outer.to_string().as_bytes()).expect("encode")
    }

    #[test]
    fn topic_matches_expected_pattern() {
        assert_eq!(topic_for_user("1434"), "oversea/res/1434");
    }

    #[test]
    fn dispatches_vehicle_info() {
        let key = vec![0x11u8; 16];
        let data = json!({"vin": "VIN1", "elecPercent": 70});
        let body = build_message("vehicleInfo", Some(&data), &key);

        let event = dispatch_push_payload(&body, &key).expect("dispatch");
        match event {
            PushEvent::VehicleInfo { vin, data: got } => {
                assert_eq!(vin.as_deref(), Some("VIN1"));
                assert_eq!(got, data);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn dispatches_remote_control_result() {
        let key = vec![0x11u8; 16];
        let data = json!({"requestSerial": "X1", "controlState": 1});
        let body = build_message("remoteControl", Some(&data), &key);

        let event = dispatch_push_payload(&body, &key).expect("dispatch");
        match event {
            PushEvent::RemoteControl {
                request_serial,
                control_state,
                ..
            } => {
                assert_eq!(request_serial, "X1");
                assert_eq!(control_state, Some(1));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_envelope_type_is_not_an_error() {
        let key = vec![0x11u8; 16];
        let body = build_message("somethingElse", None, &key);
        let event = dispatch_push_payload(&body, &key).expect("dispatch");
        assert_eq!(
            event,
            PushEvent::Unknown {
                envelope_type: "somethingElse".to_string()
            }
        );
    }

    #[test]
    fn malformed_body_is_an_error_not_a_panic() {
        assert!(dispatch_push_payload(b"not even white-box encoded", &[0u8; 16]).is_err());
    }
}
