//! `account/getAllListByUserId`: the account's vehicle list, including
//! the per-vehicle control permission the orchestrator consults before
//! triggering a command.

use serde_json::{Map, Value};

use vlink_types::{CoreError, Vin};

use crate::{as_object, AdapterContext, Result};

const ENDPOINT: &str = "account/getAllListByUserId";

/// One vehicle as reported by the account listing. `basic_control_only`
/// is the observed rule driving `EndpointNotSupported` on `BATTERY_HEAT`
/// under a "Basic control" permission profile (spec.md §4.9/§9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleSummary {
    pub vin: Vin,
    pub model: String,
    pub basic_control_only: bool,
}

pub async fn get_all_vehicles(ctx: &AdapterContext) -> Result<Vec<VehicleSummary>> {
    let data = ctx.call_authenticated(ENDPOINT, Map::new()).await?;
    let list = data
        .as_array()
        .ok_or_else(|| CoreError::ProtocolError("vehicle list response was not an array".to_string()))?;

    list.iter().map(parse_vehicle).collect()
}

fn parse_vehicle(raw: &Value) -> Result<VehicleSummary> {
    let obj = as_object(raw)?;
    let vin = obj
        .get("vin")
        .and_then(Value::as_str)
        .ok_or_else(|| CoreError::ProtocolError("vehicle entry missing vin".to_string()))?;
    let model = obj
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let basic_control_only = obj
        .get("controlPermission")
        .and_then(Value::as_str)
        .map(|p| p.eq_ignore_ascii_case("basic"))
        .unwrap_or(false);

    Ok(VehicleSummary {
        vin: Vin::new(vin),
        model,
        basic_control_only,
    })
}
