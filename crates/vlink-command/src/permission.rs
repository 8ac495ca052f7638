//! Per-vehicle command permission profile, populated from the account's
//! vehicle list and consulted before any command is triggered.

use std::collections::HashMap;

use tokio::sync::RwLock;

use vlink_types::{CommandCode, Vin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionProfile {
    /// Observed rule: `BATTERY_HEAT` is rejected under this profile.
    Basic,
    Full,
}

impl PermissionProfile {
    pub fn supports(&self, code: CommandCode) -> bool {
        match self {
            PermissionProfile::Full => true,
            PermissionProfile::Basic => !matches!(code, CommandCode::BatteryHeat),
        }
    }
}

/// Tracks the permission profile observed per VIN. A VIN with no
/// recorded profile is treated as [`PermissionProfile::Full`] — the
/// core has not yet seen anything ruling a command out, so it does not
/// guess a restriction into existence.
#[derive(Default)]
pub struct PermissionRegistry {
    profiles: RwLock<HashMap<Vin, PermissionProfile>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, vin: Vin, profile: PermissionProfile) {
        self.profiles.write().await.insert(vin, profile);
    }

    pub async fn supports(&self, vin: &Vin, code: CommandCode) -> bool {
        match self.profiles.read().await.get(vin) {
            Some(profile) => profile.supports(code),
            None => true,
        }
    }
}
