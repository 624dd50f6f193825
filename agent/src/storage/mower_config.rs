//! Zones and cutting height range configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::filesys::file::JsonFile;
use crate::models::mower::Location;

/// A named reference point in the garden
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Cutting height range of the mowers, in centimeters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CuttingRange {
    pub min: f64,
    pub max: f64,
    pub steps: u32,
}

impl Default for CuttingRange {
    fn default() -> Self {
        Self {
            min: 2.0,
            max: 6.0,
            steps: 9,
        }
    }
}

impl CuttingRange {
    /// Selector labels, one per step (e.g. `2.0|2.5|3.0`)
    pub fn level_names(&self) -> String {
        let steps = self.steps.max(1);
        if steps == 1 {
            return format!("{:.1}", self.min);
        }

        let interval = (self.max - self.min) / f64::from(steps - 1);
        (0..steps)
            .map(|i| format!("{:.1}", self.min + f64::from(i) * interval))
            .collect::<Vec<_>>()
            .join("|")
    }
}

/// Source of the zones and cutting range
pub trait ConfigSource: Send + Sync {
    fn load_zones(&self) -> Vec<Zone>;

    fn load_cutting_range(&self) -> CuttingRange;
}

#[derive(Debug, Default, Deserialize)]
struct MowerConfigFile {
    #[serde(default)]
    zones: Option<Vec<Zone>>,

    #[serde(default, rename = "height_min_max (cm)")]
    height_min_max: Option<CuttingRange>,
}

/// Configuration read once from a JSON file
#[derive(Debug, Clone, Default)]
pub struct MowerConfig {
    zones: Vec<Zone>,
    cutting_range: CuttingRange,
}

impl MowerConfig {
    pub fn new(zones: Vec<Zone>, cutting_range: CuttingRange) -> Self {
        Self { zones, cutting_range }
    }

    /// Load the configuration file.
    ///
    /// A missing or invalid file falls back to the defaults: the home location
    /// as single zone (if given) and a 2-6 cm range in 9 steps.
    pub async fn load(path: impl AsRef<Path>, home: Option<Zone>) -> Self {
        let default_zones: Vec<Zone> = home.into_iter().collect();
        let file = JsonFile::new(path.as_ref());
        debug!("Looking for configuration file {}", file.path().display());

        match file.load::<MowerConfigFile>().await {
            Ok(None) => {
                debug!("Configuration file not found, using default zones and cutting height");
                Self::new(default_zones, CuttingRange::default())
            }
            Ok(Some(config)) => {
                let zones = config.zones.unwrap_or(default_zones);
                let cutting_range = config.height_min_max.unwrap_or_default();
                debug!("Zones found: {:?}", zones);
                debug!("Cutting height range found: {:?}", cutting_range);
                Self::new(zones, cutting_range)
            }
            Err(e) => {
                error!(
                    "Error reading configuration file: {}; using default zones and cutting height",
                    e
                );
                Self::new(default_zones, CuttingRange::default())
            }
        }
    }
}

impl ConfigSource for MowerConfig {
    fn load_zones(&self) -> Vec<Zone> {
        self.zones.clone()
    }

    fn load_cutting_range(&self) -> CuttingRange {
        self.cutting_range
    }
}

/// Home location as a zone
pub fn home_zone(name: &str, location: Location) -> Zone {
    Zone {
        name: name.to_string(),
        latitude: location.latitude,
        longitude: location.longitude,
    }
}
