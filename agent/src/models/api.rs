//! Wire schemas of the Automower Connect API

use serde::Deserialize;

use crate::models::mower::{MowerActivity, MowerState};

/// OAuth2 client-credentials response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub provider: String,
    pub expires_in: i64,
}

/// `GET /mowers`
#[derive(Debug, Deserialize)]
pub struct MowerListDocument {
    #[serde(default)]
    pub data: Vec<MowerListItem>,
}

#[derive(Debug, Deserialize)]
pub struct MowerListItem {
    pub id: String,
    pub attributes: MowerListAttributes,
}

#[derive(Debug, Deserialize)]
pub struct MowerListAttributes {
    pub system: System,
}

#[derive(Debug, Deserialize)]
pub struct System {
    pub name: String,
}

/// `GET /mowers/{id}`
#[derive(Debug, Deserialize)]
pub struct MowerDocument {
    pub data: MowerData,
}

#[derive(Debug, Deserialize)]
pub struct MowerData {
    pub attributes: MowerAttributes,
}

#[derive(Debug, Deserialize)]
pub struct MowerAttributes {
    pub battery: Battery,
    pub mower: MowerApp,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub settings: Option<MowerSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Battery {
    pub battery_percent: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MowerApp {
    pub activity: MowerActivity,
    pub state: MowerState,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MowerSettings {
    #[serde(default)]
    pub cutting_height: Option<u8>,
    #[serde(default)]
    pub headlight: Option<Headlight>,
}

#[derive(Debug, Deserialize)]
pub struct Headlight {
    pub mode: String,
}
