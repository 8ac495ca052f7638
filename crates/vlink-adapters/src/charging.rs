//! Charging status: `control/smartCharge/homePage`, a direct single-call
//! read with no trigger/poll round trip.

use serde_json::{Map, Value};

use vlink_types::{FieldOrigin, Section, Vin};

use crate::{apply_payload_section, as_object, AdapterContext, Result};

const ENDPOINT: &str = "control/smartCharge/homePage";

pub async fn refresh_charging(ctx: &AdapterContext, vin: &Vin) -> Result<()> {
    let mut inner = Map::new();
    inner.insert("vin".to_string(), Value::from(vin.as_str()));
    let data = ctx.call_authenticated(ENDPOINT, inner).await?;
    apply_payload_section(&ctx.state, vin, Section::Charging, FieldOrigin::Rest, as_object(&data)?).await;
    Ok(())
}
