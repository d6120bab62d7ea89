use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// A reference airport, keyed by its IATA code (ICAO when no IATA code is
/// assigned). This is the join key used by the route ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<String>,
}

/// One outgoing route attached to an airport in the presentation document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteView {
    pub from: [f64; 2],
    pub to: [f64; 2],
    pub from_name: String,
    pub to_name: String,
    pub airline: String,
    pub flight_number: String,
}

/// Presentation form of an airport with its outgoing routes embedded,
/// written to `airports.json` for the map frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportView {
    pub code: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub country: String,
    pub routes: Vec<RouteView>,
}

impl AirportView {
    pub fn from_airport(airport: &Airport) -> Self {
        Self {
            code: airport.code.clone(),
            name: airport.name.clone(),
            lat: airport.lat,
            lon: airport.lon,
            country_code: airport.country_code.clone(),
            country: airport.country.clone(),
            routes: Vec::new(),
        }
    }
}

/// Raw OurAirports CSV row. Coordinates are kept as strings so that a single
/// malformed row is skipped rather than failing the whole download.
#[derive(Debug, Deserialize)]
struct OurAirportsRow {
    name: String,
    latitude_deg: String,
    longitude_deg: String,
    #[serde(default)]
    continent: String,
    #[serde(default)]
    iso_country: String,
    #[serde(default)]
    iata_code: String,
    #[serde(default)]
    icao_code: String,
}

/// Parse the OurAirports `airports.csv` export.
///
/// Rows without an IATA or ICAO code, or with unparsable coordinates, are
/// skipped. Duplicate codes overwrite earlier rows (last wins). When
/// `continents` is non-empty, only airports on the listed continents are kept.
pub fn parse_airports_csv(
    data: &str,
    countries: &HashMap<String, String>,
    continents: &[String],
) -> Result<Vec<Airport>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut by_code: HashMap<String, usize> = HashMap::new();
    let mut airports: Vec<Airport> = Vec::new();
    let mut skipped = 0usize;

    for row in reader.deserialize::<OurAirportsRow>() {
        let row = match row {
            Ok(row) => row,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let code = if !row.iata_code.trim().is_empty() {
            row.iata_code.trim().to_string()
        } else if !row.icao_code.trim().is_empty() {
            row.icao_code.trim().to_string()
        } else {
            skipped += 1;
            continue;
        };

        let (Ok(lat), Ok(lon)) = (
            row.latitude_deg.trim().parse::<f64>(),
            row.longitude_deg.trim().parse::<f64>(),
        ) else {
            skipped += 1;
            continue;
        };

        if !continents.is_empty() && !continents.iter().any(|c| c == row.continent.trim()) {
            continue;
        }

        let country_code = row.iso_country.trim().to_string();
        let airport = Airport {
            code: code.clone(),
            name: row.name.trim().to_string(),
            lat,
            lon,
            country: countries
                .get(&country_code)
                .cloned()
                .unwrap_or_else(|| country_code.clone()),
            country_code,
            continent: Some(row.continent.trim().to_string()).filter(|c| !c.is_empty()),
        };

        // Last wins on duplicate codes, keeping first-seen position so
        // index construction stays deterministic
        match by_code.get(&code) {
            Some(&i) => airports[i] = airport,
            None => {
                by_code.insert(code, airports.len());
                airports.push(airport);
            }
        }
    }

    debug!(
        "Parsed {} airports ({} rows skipped)",
        airports.len(),
        skipped
    );
    Ok(airports)
}

/// Parse the OurAirports `countries.csv` export into an ISO code to name map.
pub fn parse_countries_csv(data: &str) -> Result<HashMap<String, String>> {
    #[derive(Debug, Deserialize)]
    struct CountryRow {
        code: String,
        name: String,
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut countries = HashMap::new();
    for row in reader.deserialize::<CountryRow>() {
        let row = row.context("Parsing countries.csv row")?;
        countries.insert(row.code.trim().to_string(), row.name.trim().to_string());
    }
    Ok(countries)
}
