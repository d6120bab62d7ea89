use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::airports::{Airport, AirportView};
use crate::flights::ActiveFlight;
use crate::routes::{Route, Stats};

pub const AIRPORTS_FULL_FILE: &str = "airports_full.json";
pub const AIRPORTS_VIEW_FILE: &str = "airports.json";
pub const ACTIVE_FLIGHTS_FILE: &str = "active_planes.json";
pub const ROUTES_FILE: &str = "routes_dynamic.json";
pub const STATS_FILE: &str = "routes_stats.json";

/// Whole-snapshot persistence for the correlation state.
///
/// The correlator only reads and writes complete documents through this
/// trait; swapping the JSON files for an embedded store later does not touch
/// any correlation logic.
pub trait SnapshotRepository {
    fn load_airports(&self) -> Result<Vec<Airport>>;
    fn save_airports(&self, airports: &[Airport]) -> Result<()>;

    fn load_active_flights(&self) -> Result<HashMap<String, ActiveFlight>>;
    fn save_active_flights(&self, flights: &HashMap<String, ActiveFlight>) -> Result<()>;

    fn load_routes(&self) -> Result<Vec<Route>>;
    fn save_routes(&self, routes: &[Route]) -> Result<()>;

    fn load_stats(&self) -> Result<Stats>;
    fn save_stats(&self, stats: &Stats) -> Result<()>;

    fn save_airport_views(&self, views: &[AirportView]) -> Result<()>;
}

/// JSON-file snapshot store over a data directory.
#[derive(Debug, Clone)]
pub struct JsonSnapshotRepository {
    data_dir: PathBuf,
}

impl JsonSnapshotRepository {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Read a JSON document, falling back to the default value when the
    /// file is missing or unparsable. A corrupt snapshot must not fail the
    /// cycle; it just starts that collection from scratch.
    fn read_or_default<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.data_dir.join(name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => return Ok(T::default()),
        };

        match serde_json::from_str(&contents) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(
                    "Snapshot {} is unparsable ({}), starting from empty",
                    path.display(),
                    e
                );
                Ok(T::default())
            }
        }
    }

    /// Write a JSON document atomically: serialize to a temp file in the
    /// same directory, then rename over the target.
    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Creating data directory {}", self.data_dir.display()))?;

        let path = self.data_dir.join(name);
        let tmp_path = self.data_dir.join(format!("{name}.tmp"));

        let contents = serde_json::to_string_pretty(value)
            .with_context(|| format!("Serializing snapshot {name}"))?;
        fs::write(&tmp_path, contents)
            .with_context(|| format!("Writing {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Replacing {}", path.display()))?;
        Ok(())
    }
}

impl SnapshotRepository for JsonSnapshotRepository {
    fn load_airports(&self) -> Result<Vec<Airport>> {
        self.read_or_default(AIRPORTS_FULL_FILE)
    }

    fn save_airports(&self, airports: &[Airport]) -> Result<()> {
        self.write_json(AIRPORTS_FULL_FILE, &airports)
    }

    fn load_active_flights(&self) -> Result<HashMap<String, ActiveFlight>> {
        self.read_or_default(ACTIVE_FLIGHTS_FILE)
    }

    fn save_active_flights(&self, flights: &HashMap<String, ActiveFlight>) -> Result<()> {
        self.write_json(ACTIVE_FLIGHTS_FILE, flights)
    }

    fn load_routes(&self) -> Result<Vec<Route>> {
        self.read_or_default(ROUTES_FILE)
    }

    fn save_routes(&self, routes: &[Route]) -> Result<()> {
        self.write_json(ROUTES_FILE, &routes)
    }

    fn load_stats(&self) -> Result<Stats> {
        self.read_or_default(STATS_FILE)
    }

    fn save_stats(&self, stats: &Stats) -> Result<()> {
        self.write_json(STATS_FILE, stats)
    }

    fn save_airport_views(&self, views: &[AirportView]) -> Result<()> {
        self.write_json(AIRPORTS_VIEW_FILE, &views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::routes::RouteStatus;

    #[test]
    fn test_missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSnapshotRepository::new(dir.path());

        assert!(repo.load_airports().unwrap().is_empty());
        assert!(repo.load_active_flights().unwrap().is_empty());
        assert!(repo.load_routes().unwrap().is_empty());
        assert_eq!(repo.load_stats().unwrap().routes, 0);
    }

    #[test]
    fn test_corrupt_snapshot_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ROUTES_FILE), "{not json").unwrap();

        let repo = JsonSnapshotRepository::new(dir.path());
        assert!(repo.load_routes().unwrap().is_empty());
    }

    #[test]
    fn test_routes_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSnapshotRepository::new(dir.path());

        let now = Utc::now();
        let routes = vec![Route {
            airline: "AL".to_string(),
            flight_number: "123".to_string(),
            icao24: "abc".to_string(),
            source: "AAA".to_string(),
            destination: "BBB".to_string(),
            first_seen: now,
            last_seen: now,
            status: RouteStatus::NotActive,
        }];
        repo.save_routes(&routes).unwrap();

        let loaded = repo.load_routes().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].source, "AAA");
        assert_eq!(loaded[0].status, RouteStatus::NotActive);

        // Status is stored in its display form
        let raw = std::fs::read_to_string(dir.path().join(ROUTES_FILE)).unwrap();
        assert!(raw.contains("\"Not Active\""));
    }

    #[test]
    fn test_no_leftover_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonSnapshotRepository::new(dir.path());
        repo.save_stats(&Stats::default()).unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![STATS_FILE.to_string()]);
    }
}
