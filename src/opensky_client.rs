use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::BoundingBox;
use crate::flights::PositionReport;

const OPENSKY_STATES_URL: &str = "https://opensky-network.org/api/states/all";

/// OpenSky's `/states/all` response. Each state vector is a heterogeneous
/// array; only icao24 (0), callsign (1), longitude (5), and latitude (6)
/// are of interest here.
#[derive(Debug, Deserialize)]
struct StatesResponse {
    #[serde(default)]
    states: Option<Vec<Vec<serde_json::Value>>>,
}

fn report_from_state(state: &[serde_json::Value]) -> Option<PositionReport> {
    let icao24 = state.first()?.as_str()?.trim().to_string();
    if icao24.is_empty() {
        return None;
    }
    let callsign = state
        .get(1)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    Some(PositionReport {
        icao24,
        callsign,
        longitude: state.get(5).and_then(|v| v.as_f64()),
        latitude: state.get(6).and_then(|v| v.as_f64()),
    })
}

/// Fetch one snapshot of position reports from the OpenSky state feed,
/// optionally constrained to a bounding box.
pub async fn fetch_position_reports(
    client: &reqwest::Client,
    bbox: Option<BoundingBox>,
) -> Result<Vec<PositionReport>> {
    let mut request = client.get(OPENSKY_STATES_URL);
    if let Some(bbox) = bbox {
        debug!("Constraining state feed to bounding box {:?}", bbox);
        request = request.query(&[
            ("lamin", bbox.lamin),
            ("lomin", bbox.lomin),
            ("lamax", bbox.lamax),
            ("lomax", bbox.lomax),
        ]);
    }

    let response = request
        .send()
        .await
        .context("Requesting OpenSky state feed")?
        .error_for_status()
        .context("OpenSky state feed returned an error status")?;

    let body: StatesResponse = response
        .json()
        .await
        .context("Decoding OpenSky state feed")?;

    let reports: Vec<PositionReport> = body
        .states
        .unwrap_or_default()
        .iter()
        .filter_map(|state| report_from_state(state))
        .collect();

    info!("Fetched {} position reports from OpenSky", reports.len());
    Ok(reports)
}
