//! Realtime vehicle status: the trigger+poll pair
//! (`vehicleRealTimeRequest`/`vehicleRealTimeResult`) and the direct
//! single-call read (`control/getStatusNow`).

use std::time::Duration;

use serde_json::{Map, Value};

use vlink_types::{CoreError, FieldOrigin, Section, Vin};

use crate::{apply_payload_section, as_object, is_online, AdapterContext, Result};

const TRIGGER_ENDPOINT: &str = "vehicleRealTimeRequest";
const POLL_ENDPOINT: &str = "vehicleRealTimeResult";
const STATUS_NOW_ENDPOINT: &str = "control/getStatusNow";

/// Triggers a realtime refresh and polls for the result, applying the
/// realtime section to the state store as soon as a poll reports
/// `onlineState=1` (or the attempts are exhausted, applying the last
/// response either way — never leaving observed telemetry unrecorded).
pub async fn refresh_realtime(ctx: &AdapterContext, vin: &Vin, poll_attempts: u32, poll_interval: Duration) -> Result<()> {
    let mut inner = Map::new();
    inner.insert("vin".to_string(), Value::from(vin.as_str()));
    let trigger_data = ctx.call_authenticated(TRIGGER_ENDPOINT, inner).await?;
    let trigger_obj = as_object(&trigger_data)?;
    let request_serial = trigger_obj
        .get("requestSerial")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::ProtocolError("realtime trigger missing requestSerial".to_string()))?
        .to_string();

    if is_online(&trigger_data) {
        apply_payload_section(&ctx.state, vin, Section::Realtime, FieldOrigin::Rest, trigger_obj).await;
        return Ok(());
    }

    let mut last = trigger_data;
    for _ in 0..poll_attempts {
        tokio::time::sleep(poll_interval).await;

        let mut inner = Map::new();
        inner.insert("vin".to_string(), Value::from(vin.as_str()));
        inner.insert("requestSerial".to_string(), Value::from(request_serial.as_str()));
        let data = ctx.call_authenticated(POLL_ENDPOINT, inner).await?;
        let online = is_online(&data);
        last = data;
        if online {
            break;
        }
    }

    apply_payload_section(&ctx.state, vin, Section::Realtime, FieldOrigin::Rest, as_object(&last)?).await;
    Ok(())
}

/// Single-call realtime read, no trigger/poll round trip.
pub async fn get_status_now(ctx: &AdapterContext, vin: &Vin) -> Result<()> {
    let mut inner = Map::new();
    inner.insert("vin".to_string(), Value::from(vin.as_str()));
    let data = ctx.call_authenticated(STATUS_NOW_ENDPOINT, inner).await?;
    apply_payload_section(&ctx.state, vin, Section::Realtime, FieldOrigin::Rest, as_object(&data)?).await;
    Ok(())
}
