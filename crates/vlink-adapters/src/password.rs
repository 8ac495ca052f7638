//! `vehicle/vehicleswitch/verifyControlPassword`: confirms a control PIN
//! before the façade lets the user arm PIN-gated commands. Read-only with
//! respect to the state store — nothing here feeds C8.

use serde_json::{Map, Value};

use vlink_types::CoreError;

use crate::{AdapterContext, Result};

const ENDPOINT: &str = "vehicle/vehicleswitch/verifyControlPassword";

/// Returns `Ok(())` if `pin` verifies, `Err(CoreError::ControlPasswordWrong)`
/// otherwise (surfaced by the transport's code classification).
pub async fn verify_control_password(ctx: &AdapterContext, pin_md5_upper: &str) -> Result<()> {
    let mut inner = Map::new();
    inner.insert("commandPwd".to_string(), Value::from(pin_md5_upper));
    ctx.call_authenticated(ENDPOINT, inner).await?;
    Ok(())
}
