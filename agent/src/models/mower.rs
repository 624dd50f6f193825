//! Mower model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse operational mode reported by the mower
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MowerState {
    NotApplicable,
    Paused,
    InOperation,
    WaitUpdating,
    WaitPowerUp,
    Restricted,
    Off,
    Stopped,
    Error,
    FatalError,
    ErrorAtPowerUp,
    /// No status fetched yet, or a state this agent does not know
    #[default]
    #[serde(other)]
    Unknown,
}

impl MowerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MowerState::Unknown => "UNKNOWN",
            MowerState::NotApplicable => "NOT_APPLICABLE",
            MowerState::Paused => "PAUSED",
            MowerState::InOperation => "IN_OPERATION",
            MowerState::WaitUpdating => "WAIT_UPDATING",
            MowerState::WaitPowerUp => "WAIT_POWER_UP",
            MowerState::Restricted => "RESTRICTED",
            MowerState::Off => "OFF",
            MowerState::Stopped => "STOPPED",
            MowerState::Error => "ERROR",
            MowerState::FatalError => "FATAL_ERROR",
            MowerState::ErrorAtPowerUp => "ERROR_AT_POWER_UP",
        }
    }

    /// Every state carrying an error code
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            MowerState::Error | MowerState::FatalError | MowerState::ErrorAtPowerUp
        )
    }
}

impl fmt::Display for MowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine-grained current behavior of the mower
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MowerActivity {
    NotApplicable,
    Mowing,
    GoingHome,
    Charging,
    Leaving,
    #[serde(rename = "PARKED_IN_CS")]
    ParkedInCs,
    StoppedInGarden,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MowerActivity {
    pub fn as_str(&self) -> &'static str {
        match self {
            MowerActivity::Unknown => "UNKNOWN",
            MowerActivity::NotApplicable => "NOT_APPLICABLE",
            MowerActivity::Mowing => "MOWING",
            MowerActivity::GoingHome => "GOING_HOME",
            MowerActivity::Charging => "CHARGING",
            MowerActivity::Leaving => "LEAVING",
            MowerActivity::ParkedInCs => "PARKED_IN_CS",
            MowerActivity::StoppedInGarden => "STOPPED_IN_GARDEN",
        }
    }

    /// Activities shown as "running" on the host's run switch
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            MowerActivity::Leaving
                | MowerActivity::Mowing
                | MowerActivity::Charging
                | MowerActivity::GoingHome
        )
    }
}

impl fmt::Display for MowerActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GPS position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A remote mower as mirrored by the registry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mower {
    /// Remote identifier, only used to build API paths
    pub id: String,

    /// Display name, the stable external key
    pub name: String,

    pub state: MowerState,

    pub activity: MowerActivity,

    pub battery_pct: Option<u8>,

    /// Raw error code, present only while in an error state
    pub error_code: Option<u16>,

    /// Human-readable description of `error_code`
    pub error_state: Option<String>,

    pub location: Option<Location>,

    /// 1-based cutting height step
    pub cutting_height: Option<u8>,
}

impl Mower {
    /// Create a mower known only by its list entry
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_off(&self) -> bool {
        self.state == MowerState::Off
    }
}
