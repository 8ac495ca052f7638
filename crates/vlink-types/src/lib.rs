//! # vlink-types
//!
//! Shared domain types for the vehicle telematics core: the vehicle
//! identifier, per-vehicle state sections, command codes, the session
//! tuple, device identity, and the unified error taxonomy every other
//! crate in the workspace converts into.
//!
//! No crate in this workspace depends on more than one "layer" below it;
//! `vlink-types` sits at the bottom and depends on nothing internal.

pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod section;
pub mod session;
pub mod vin;

pub use command::{CommandAttempt, CommandCode, CommandOutcome, Mechanism};
pub use config::Config;
pub use device::DeviceIdentity;
pub use error::CoreError;
pub use section::{
    is_absent_sentinel, normalize_field, FieldOrigin, FieldValue, Section, SectionEvent,
    SectionSnapshot,
};
pub use session::Session;
pub use vin::Vin;

/// Convenience result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Current epoch time in milliseconds, matching the wire protocol's
/// `reqTimestamp` resolution.
pub fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Current epoch time in whole seconds, used for session TTL and overlay
/// expiry bookkeeping.
pub fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
