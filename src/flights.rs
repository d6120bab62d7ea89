use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw position report from the state feed, one per aircraft per cycle.
///
/// `icao24` is the stable hardware transponder address; the callsign is
/// human-assigned and may change between cycles. Either coordinate may be
/// missing, in which case the report is ignored for correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionReport {
    pub icao24: String,
    #[serde(default)]
    pub callsign: String,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
}

impl PositionReport {
    /// The report's (lat, lon) pair, or `None` if either half is missing.
    pub fn coordinates(&self) -> Option<[f64; 2]> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some([lat, lon]),
            _ => None,
        }
    }
}

/// Per-aircraft flight state carried across ingestion cycles.
///
/// The origin is resolved exactly once, from the first coordinate the
/// aircraft was observed at; only the last coordinate, timestamp, and
/// callsign-derived fields are refreshed on later sightings. Coordinates are
/// stored as `[lat, lon]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveFlight {
    pub icao24: String,
    pub callsign: String,
    pub airline: String,
    pub flight_number: String,
    #[serde(default)]
    pub origin_code: Option<String>,
    #[serde(default)]
    pub origin_name: Option<String>,
    pub origin_coord: [f64; 2],
    pub last_coord: [f64; 2],
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
