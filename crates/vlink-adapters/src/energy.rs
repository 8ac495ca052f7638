//! Energy consumption history: `vehicleInfo/vehicle/getEnergyConsumption`,
//! a direct single-call read applied to the `energy` section.

use serde_json::{Map, Value};

use vlink_types::{FieldOrigin, Section, Vin};

use crate::{apply_payload_section, as_object, AdapterContext, Result};

const ENDPOINT: &str = "vehicleInfo/vehicle/getEnergyConsumption";

pub async fn refresh_energy_consumption(ctx: &AdapterContext, vin: &Vin) -> Result<()> {
    let mut inner = Map::new();
    inner.insert("vin".to_string(), Value::from(vin.as_str()));
    let data = ctx.call_authenticated(ENDPOINT, inner).await?;
    apply_payload_section(&ctx.state, vin, Section::Energy, FieldOrigin::Rest, as_object(&data)?).await;
    Ok(())
}
