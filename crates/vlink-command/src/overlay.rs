//! The optimistic overlay table applied on command success (§4.9),
//! TTL ≈ 120s.

use std::collections::HashMap;

use serde_json::Value;

use vlink_types::{CommandCode, Section};

pub const OVERLAY_TTL_MS: u64 = 120_000;

/// Returns the `(section, fields)` pairs a successful command projects
/// ahead of the next telemetry update. `FLASH_LIGHTS`/`FIND_CAR` project
/// nothing — they are fire-and-forget.
pub fn overlay_fields(code: CommandCode, params: Option<&Value>) -> Vec<(Section, HashMap<String, Value>)> {
    match code {
        CommandCode::Lock => vec![(Section::Realtime, door_lock_fields("locked"))],
        CommandCode::Unlock => vec![(Section::Realtime, door_lock_fields("unlocked"))],
        CommandCode::StartClimate => {
            let mut fields = HashMap::new();
            fields.insert("acSwitch".to_string(), Value::from("on"));
            if let Some(temp) = params.and_then(|p| p.get("mainSettingTemp")) {
                fields.insert("mainSettingTemp".to_string(), temp.clone());
            }
            vec![(Section::Hvac, fields)]
        }
        CommandCode::StopClimate => {
            let mut fields = HashMap::new();
            fields.insert("acSwitch".to_string(), Value::from("off"));
            vec![(Section::Hvac, fields)]
        }
        CommandCode::CloseWindows => {
            let mut fields = HashMap::new();
            fields.insert("windows".to_string(), Value::from("closed"));
            vec![(Section::Realtime, fields)]
        }
        CommandCode::FlashLights | CommandCode::FindCar | CommandCode::ScheduleClimate => vec![],
        CommandCode::SeatClimate => {
            let fields = params
                .and_then(Value::as_object)
                .map(|obj| {
                    obj.iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<HashMap<_, _>>()
                })
                .unwrap_or_default();
            vec![(Section::Hvac, fields)]
        }
        CommandCode::BatteryHeat => {
            let mut fields = HashMap::new();
            let on = params
                .and_then(|p| p.get("on"))
                .and_then(Value::as_bool)
                .unwrap_or(true);
            fields.insert("batteryHeatState".to_string(), Value::from(if on { "on" } else { "off" }));
            vec![(Section::Charging, fields)]
        }
    }
}

fn door_lock_fields(state: &str) -> HashMap<String, Value> {
    let mut fields = HashMap::new();
    fields.insert("doorLockFl".to_string(), Value::from(state));
    fields.insert("doorLockFr".to_string(), Value::from(state));
    fields.insert("doorLockRl".to_string(), Value::from(state));
    fields.insert("doorLockRr".to_string(), Value::from(state));
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lock_projects_all_four_doors() {
        let overlays = overlay_fields(CommandCode::Lock, None);
        assert_eq!(overlays.len(), 1);
        let (section, fields) = &overlays[0];
        assert_eq!(*section, Section::Realtime);
        assert_eq!(fields.len(), 4);
        assert!(fields.values().all(|v| v == "locked"));
    }

    #[test]
    fn find_car_projects_nothing() {
        assert!(overlay_fields(CommandCode::FindCar, None).is_empty());
    }

    #[test]
    fn start_climate_carries_requested_temperature() {
        let params = json!({"mainSettingTemp": 22});
        let overlays = overlay_fields(CommandCode::StartClimate, Some(&params));
        let (section, fields) = &overlays[0];
        assert_eq!(*section, Section::Hvac);
        assert_eq!(fields.get("mainSettingTemp"), Some(&json!(22)));
        assert_eq!(fields.get("acSwitch"), Some(&Value::from("on")));
    }
}
