//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mean earth radius used for great-circle distances
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Version information for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Delay before a call attempt (1-based): the fixed minimum delay plus a
/// backoff growing linearly with every retry
pub fn calc_linear_backoff(min_delay: Duration, backoff: Duration, attempt: u32) -> Duration {
    min_delay + backoff.saturating_mul(attempt.saturating_sub(1))
}

/// Great-circle distance in kilometers between two (latitude, longitude) pairs
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/// Generate a random UUID v4
pub fn generate_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}
