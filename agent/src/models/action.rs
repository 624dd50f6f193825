//! Remote commands accepted by a mower

use std::fmt;

use serde_json::{json, Value};

use crate::errors::AgentError;

/// Start duration used by the run switch (24 hours)
pub const START_DURATION_RUN_SWITCH: u32 = 1440;

/// Start duration used by the actions selector (6 hours)
pub const START_DURATION_SELECTOR: u32 = 360;

/// Remote endpoint an action is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionEndpoint {
    Actions,
    Settings,
}

impl ActionEndpoint {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ActionEndpoint::Actions => "actions",
            ActionEndpoint::Settings => "settings",
        }
    }
}

/// An action together with its parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MowerAction {
    Start { duration_minutes: u32 },
    Pause,
    ResumeSchedule,
    ParkUntilFurtherNotice,
    ParkUntilNextSchedule,
    /// 1-based cutting height step
    SetCuttingHeight(u8),
    SetHeadlight(bool),
}

impl MowerAction {
    /// Name of the action as known by the remote API
    pub fn name(&self) -> &'static str {
        match self {
            MowerAction::Start { .. } => "Start",
            MowerAction::Pause => "Pause",
            MowerAction::ResumeSchedule => "ResumeSchedule",
            MowerAction::ParkUntilFurtherNotice => "ParkUntilFurtherNotice",
            MowerAction::ParkUntilNextSchedule => "ParkUntilNextSchedule",
            MowerAction::SetCuttingHeight(_) => "SetCuttingHeight",
            MowerAction::SetHeadlight(_) => "SetHeadlight",
        }
    }

    pub fn endpoint(&self) -> ActionEndpoint {
        match self {
            MowerAction::Start { .. }
            | MowerAction::Pause
            | MowerAction::ResumeSchedule
            | MowerAction::ParkUntilFurtherNotice
            | MowerAction::ParkUntilNextSchedule => ActionEndpoint::Actions,
            MowerAction::SetCuttingHeight(_) | MowerAction::SetHeadlight(_) => {
                ActionEndpoint::Settings
            }
        }
    }

    /// Reject parameters the remote API would refuse
    pub fn validate(&self) -> Result<(), AgentError> {
        match self {
            MowerAction::Start { duration_minutes } if *duration_minutes == 0 => Err(
                AgentError::ValidationError("start duration must be at least one minute".into()),
            ),
            MowerAction::SetCuttingHeight(step) if *step == 0 => Err(
                AgentError::ValidationError("cutting height steps start at 1".into()),
            ),
            _ => Ok(()),
        }
    }

    /// JSON:API request body
    pub fn payload(&self) -> Value {
        match self {
            MowerAction::Start { duration_minutes } => json!({
                "data": { "type": self.name(), "attributes": { "duration": duration_minutes } }
            }),
            MowerAction::Pause
            | MowerAction::ResumeSchedule
            | MowerAction::ParkUntilFurtherNotice
            | MowerAction::ParkUntilNextSchedule => json!({
                "data": { "type": self.name() }
            }),
            MowerAction::SetCuttingHeight(step) => json!({
                "data": { "type": "settings", "attributes": { "cuttingHeight": step } }
            }),
            MowerAction::SetHeadlight(on) => {
                let mode = if *on { "ALWAYS_ON" } else { "ALWAYS_OFF" };
                json!({
                    "data": { "type": "settings", "attributes": { "headlight": { "mode": mode } } }
                })
            }
        }
    }
}

impl fmt::Display for MowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MowerAction::Start { duration_minutes } => {
                write!(f, "Start ({duration_minutes} min)")
            }
            MowerAction::SetCuttingHeight(step) => write!(f, "SetCuttingHeight ({step})"),
            MowerAction::SetHeadlight(on) => {
                write!(f, "SetHeadlight ({})", if *on { "on" } else { "off" })
            }
            other => f.write_str(other.name()),
        }
    }
}
