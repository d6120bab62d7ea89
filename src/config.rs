use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

pub const CONFIG_FILE: &str = "config.json";

/// Latitude/longitude box in the OpenSky query parameter order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lamin: f64,
    pub lomin: f64,
    pub lamax: f64,
    pub lomax: f64,
}

impl BoundingBox {
    fn union(self, other: BoundingBox) -> BoundingBox {
        BoundingBox {
            lamin: self.lamin.min(other.lamin),
            lomin: self.lomin.min(other.lomin),
            lamax: self.lamax.max(other.lamax),
            lomax: self.lomax.max(other.lomax),
        }
    }
}

pub struct ContinentInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub bbox: BoundingBox,
}

/// Continent codes as used in the OurAirports data, with rough bounding
/// boxes for constraining the state feed.
pub const CONTINENTS: [ContinentInfo; 7] = [
    ContinentInfo {
        code: "AF",
        name: "Africa",
        bbox: BoundingBox { lamin: -35.0, lomin: -18.0, lamax: 38.0, lomax: 52.0 },
    },
    ContinentInfo {
        code: "AN",
        name: "Antarctica",
        bbox: BoundingBox { lamin: -90.0, lomin: -180.0, lamax: -60.0, lomax: 180.0 },
    },
    ContinentInfo {
        code: "AS",
        name: "Asia",
        bbox: BoundingBox { lamin: -11.0, lomin: 25.0, lamax: 78.0, lomax: 180.0 },
    },
    ContinentInfo {
        code: "EU",
        name: "Europe",
        bbox: BoundingBox { lamin: 34.0, lomin: -25.0, lamax: 72.0, lomax: 45.0 },
    },
    ContinentInfo {
        code: "NA",
        name: "North America",
        bbox: BoundingBox { lamin: 5.0, lomin: -170.0, lamax: 84.0, lomax: -50.0 },
    },
    ContinentInfo {
        code: "OC",
        name: "Oceania",
        bbox: BoundingBox { lamin: -48.0, lomin: 110.0, lamax: 0.0, lomax: 180.0 },
    },
    ContinentInfo {
        code: "SA",
        name: "South America",
        bbox: BoundingBox { lamin: -56.0, lomin: -82.0, lamax: 13.0, lomax: -34.0 },
    },
];

fn continent(code: &str) -> Option<&'static ContinentInfo> {
    CONTINENTS.iter().find(|c| c.code == code)
}

fn default_airport_continents() -> Vec<String> {
    vec!["EU".to_string()]
}

/// Admin-editable configuration, persisted as `config.json` in the data
/// directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Continents whose airports are loaded from the reference data.
    /// Empty means no filter.
    #[serde(default = "default_airport_continents")]
    pub airport_continents: Vec<String>,
    /// Continents the state feed is constrained to. Empty means worldwide.
    #[serde(default)]
    pub flight_continents: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            airport_continents: default_airport_continents(),
            flight_continents: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load the config document, falling back to defaults when missing or
    /// unparsable.
    pub fn load(data_dir: &Path) -> AppConfig {
        let path = data_dir.join(CONFIG_FILE);
        let Ok(contents) = fs::read_to_string(&path) else {
            return AppConfig::default();
        };
        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                warn!("Config {} is unparsable ({}), using defaults", path.display(), e);
                AppConfig::default()
            }
        }
    }

    /// Persist the config atomically: write a temp file in the same
    /// directory, then rename over the target. A crash mid-write must not
    /// leave a corrupt document behind.
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(CONFIG_FILE);
        let tmp_path = data_dir.join(format!("{CONFIG_FILE}.tmp"));

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Reject continent codes that are not in the known table.
    pub fn validate(&self) -> Result<()> {
        for code in self.airport_continents.iter().chain(&self.flight_continents) {
            if continent(code).is_none() {
                bail!("Unknown continent code: {code}");
            }
        }
        Ok(())
    }

    /// A single bounding box covering all configured flight continents,
    /// or `None` for a worldwide feed.
    pub fn flight_bounding_box(&self) -> Option<BoundingBox> {
        self.flight_continents
            .iter()
            .filter_map(|code| continent(code).map(|c| c.bbox))
            .reduce(BoundingBox::union)
    }
}
