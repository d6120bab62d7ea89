use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Route status, a pure function of how recently the route was last seen.
/// Serialized as `"Active"` / `"Not Active"` in the routes document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStatus {
    Active,
    #[serde(rename = "Not Active")]
    NotActive,
}

/// An inferred air route: one record per (airline, flight number, source,
/// destination). `icao24` is the last aircraft that matched this key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub airline: String,
    pub flight_number: String,
    pub icao24: String,
    pub source: String,
    pub destination: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: RouteStatus,
}

/// Composite dedup key for the route ledger.
pub type RouteKey = (String, String, String, String);

impl Route {
    pub fn key(&self) -> RouteKey {
        (
            self.airline.clone(),
            self.flight_number.clone(),
            self.source.clone(),
            self.destination.clone(),
        )
    }
}

/// Summary statistics recomputed after every correlation cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub routes: usize,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_planes: usize,
    #[serde(default)]
    pub removed_last_run: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_string(&RouteStatus::Active).unwrap(),
            "\"Active\""
        );
        assert_eq!(
            serde_json::to_string(&RouteStatus::NotActive).unwrap(),
            "\"Not Active\""
        );
        assert_eq!(
            serde_json::from_str::<RouteStatus>("\"Not Active\"").unwrap(),
            RouteStatus::NotActive
        );
    }

    #[test]
    fn test_stats_defaults_from_empty_document() {
        let stats: Stats = serde_json::from_str("{\"routes\": 3}").unwrap();
        assert_eq!(stats.routes, 3);
        assert!(stats.last_run.is_none());
        assert_eq!(stats.active_planes, 0);
        assert_eq!(stats.removed_last_run, 0);
    }
}
