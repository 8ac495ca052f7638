use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vin::Vin;

/// A named slice of per-vehicle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    Realtime,
    Hvac,
    Charging,
    Gps,
    Energy,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Realtime,
        Section::Hvac,
        Section::Charging,
        Section::Gps,
        Section::Energy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Realtime => "realtime",
            Section::Hvac => "hvac",
            Section::Charging => "charging",
            Section::Gps => "gps",
            Section::Energy => "energy",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a stored field's value most recently came from. Optimistic
/// overlays are always superseded by a later rest/push update for the
/// same key, regardless of timestamp ordering (see [`Section`] invariants
/// in the data model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOrigin {
    Rest,
    Push,
    Optimistic,
}

/// A single stored field: its value plus the bookkeeping needed to apply
/// the merge and expiry rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: Value,
    pub origin: FieldOrigin,
    /// Epoch-ms the value was observed at (rest/push) or applied at
    /// (optimistic).
    pub observed_at: u64,
    /// Set only for optimistic overlays; lazily checked on read.
    pub expires_at: Option<u64>,
    /// Monotonic per-event sequence, used to break ties when two events
    /// carry the same `observed_at`.
    pub sequence: u64,
}

impl FieldValue {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        matches!(self.expires_at, Some(exp) if now_ms >= exp)
    }
}

/// An immutable, already-merged view of one vehicle's one section,
/// returned by `StateStore::get_section`. Expired optimistic overlays
/// are never present in a snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionSnapshot {
    pub fields: HashMap<String, FieldValue>,
}

impl SectionSnapshot {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).map(|f| &f.value)
    }
}

/// An incoming update destined for the state store: one section's worth
/// of fields observed at a single point in time, from a single origin.
#[derive(Debug, Clone)]
pub struct SectionEvent {
    pub vin: Vin,
    pub section: Section,
    pub origin: FieldOrigin,
    pub observed_at: u64,
    pub fields: HashMap<String, Value>,
}

/// Fields whose `-1` reading means "not available" rather than a literal
/// zero-ish duration, per the field normalization rules.
const TIME_TO_FULL_FIELDS: &[&str] = &["fullHour", "fullMinute"];

/// True if `value` under `field_key` is one of the documented absent
/// sentinels: `""`, `"--"`, `null`, NaN, cabin temperature `-129`, or a
/// `-1` reading on a time-to-full field.
pub fn is_absent_sentinel(field_key: &str, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty() || s == "--",
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.is_nan() {
                    return true;
                }
            }
            if field_key == "tempInCar" {
                if let Some(i) = n.as_i64() {
                    return i == -129;
                }
            }
            if TIME_TO_FULL_FIELDS.contains(&field_key) {
                if let Some(i) = n.as_i64() {
                    return i == -1;
                }
            }
            false
        }
        _ => false,
    }
}

/// Apply the field normalization rules: sentinel values become `None`
/// (the caller should drop the key rather than store it), numeric
/// strings are parsed into numbers, everything else passes through
/// unchanged including out-of-range enum integers (preserved raw, per
/// the "known enum or raw int" rule).
pub fn normalize_field(field_key: &str, value: Value) -> Option<Value> {
    if is_absent_sentinel(field_key, &value) {
        return None;
    }
    if let Value::String(s) = &value {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Value::from(i));
        }
        if let Ok(f) = s.parse::<f64>() {
            return Some(Value::from(f));
        }
    }
    Some(value)
}
