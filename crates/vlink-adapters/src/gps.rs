//! GPS position: trigger+poll pair (`control/getGpsInfo`/`getGpsInfoResult`),
//! same shape as the realtime adapter.

use std::time::Duration;

use serde_json::{Map, Value};

use vlink_types::{CoreError, FieldOrigin, Section, Vin};

use crate::{apply_payload_section, as_object, is_online, AdapterContext, Result};

const TRIGGER_ENDPOINT: &str = "control/getGpsInfo";
const POLL_ENDPOINT: &str = "control/getGpsInfoResult";

pub async fn refresh_gps(ctx: &AdapterContext, vin: &Vin, poll_attempts: u32, poll_interval: Duration) -> Result<()> {
    let mut inner = Map::new();
    inner.insert("vin".to_string(), Value::from(vin.as_str()));
    let trigger_data = ctx.call_authenticated(TRIGGER_ENDPOINT, inner).await?;
    let trigger_obj = as_object(&trigger_data)?;
    let request_serial = trigger_obj
        .get("requestSerial")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::ProtocolError("gps trigger missing requestSerial".to_string()))?
        .to_string();

    if is_online(&trigger_data) {
        apply_payload_section(&ctx.state, vin, Section::Gps, FieldOrigin::Rest, trigger_obj).await;
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

    apply_payload_section(&ctx.state, vin, Section::Gps, FieldOrigin::Rest, as_object(&last)?).await;
    Ok(())
}
