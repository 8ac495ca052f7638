use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vin::Vin;

/// Application-level remote command. Each variant maps to exactly one
/// wire `commandType` string (see [`CommandCode::wire_command_type`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandCode {
    Lock,
    Unlock,
    StartClimate,
    StopClimate,
    ScheduleClimate,
    FindCar,
    FlashLights,
    CloseWindows,
    SeatClimate,
    BatteryHeat,
}

impl CommandCode {
    /// The server-side `commandType` string this code is sent as.
    pub fn wire_command_type(&self) -> &'static str {
        match self {
            CommandCode::Lock => "LOCKDOOR",
            CommandCode::Unlock => "OPENDOOR",
            CommandCode::StartClimate => "OPENAIR",
            CommandCode::StopClimate => "CLOSEAIR",
            CommandCode::ScheduleClimate => "BOOKINGAIR",
            CommandCode::FindCar => "FINDCAR",
            CommandCode::FlashLights => "FLASHLIGHTNOWHISTLE",
            CommandCode::CloseWindows => "CLOSEWINDOW",
            CommandCode::SeatClimate => "VENTILATIONHEATING",
            CommandCode::BatteryHeat => "BATTERYHEAT",
        }
    }
}

/// Terminal or in-flight state of a single command attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandOutcome {
    Pending,
    Success,
    Failure,
    Timeout,
    Cancelled,
}

/// Which channel resolved a command attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mechanism {
    Mqtt,
    Poll,
}

/// One in-flight or completed remote command, as tracked by the
/// orchestrator from trigger response through resolution.
#[derive(Debug, Clone)]
pub struct CommandAttempt {
    pub vin: Vin,
    pub code: CommandCode,
    pub params: Option<Value>,
    pub trigger_serial: String,
    pub started_at: u64,
    pub deadline: u64,
    pub outcome: CommandOutcome,
    pub mechanism: Option<Mechanism>,
}

impl CommandAttempt {
    pub fn new(
        vin: Vin,
        code: CommandCode,
        params: Option<Value>,
        trigger_serial: String,
        started_at: u64,
        deadline: u64,
    ) -> Self {
        Self {
            vin,
            code,
            params,
            trigger_serial,
            started_at,
            deadline,
            outcome: CommandOutcome::Pending,
            mechanism: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.outcome, CommandOutcome::Pending)
    }
}
