//! `app/emqAuth/getEmqBrokerIp`: MQTT broker discovery, feeding
//! `vlink_push::listener::BrokerAddress`. C7 never calls C6 itself — the
//! caller resolves the broker once and hands it to `PushListener::connect`.

use serde_json::{Map, Value};

use vlink_push::listener::BrokerAddress;
use vlink_types::CoreError;

use crate::{as_object, AdapterContext, Result};

const ENDPOINT: &str = "app/emqAuth/getEmqBrokerIp";

pub async fn discover_broker(ctx: &AdapterContext) -> Result<BrokerAddress> {
    let data = ctx.call_authenticated(ENDPOINT, Map::new()).await?;
    let obj = as_object(&data)?;
    let host = obj
        .get("host")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::ProtocolError("broker discovery missing host".to_string()))?
        .to_string();
    let port = obj
        .get("port")
        .and_then(Value::as_u64)
        .ok_or_else(|| CoreError::ProtocolError("broker discovery missing port".to_string()))?;

    Ok(BrokerAddress {
        host,
        port: port as u16,
    })
}
