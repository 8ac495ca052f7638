use std::fmt;

use serde::{Deserialize, Serialize};

/// A vehicle identification number, used as the primary key throughout
/// the state store and command orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vin(String);

impl Vin {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Vin {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for Vin {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}
