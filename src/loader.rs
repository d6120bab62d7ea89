use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use crate::airlines::parse_airlines_dat;
use crate::airports::{Airport, AirportView, RouteView, parse_airports_csv, parse_countries_csv};
use crate::config::AppConfig;
use crate::route_ledger::RouteLedger;
use crate::snapshot_repo::SnapshotRepository;

const AIRPORTS_URL: &str =
    "https://raw.githubusercontent.com/davidmegginson/ourairports-data/master/airports.csv";
const COUNTRIES_URL: &str =
    "https://raw.githubusercontent.com/davidmegginson/ourairports-data/master/countries.csv";
const AIRLINES_URL: &str =
    "https://raw.githubusercontent.com/jpatokal/openflights/master/data/airlines.dat";

const DOWNLOAD_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub airports: usize,
    pub routes: usize,
}

async fn download_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let mut last_error = None;

    for attempt in 1..=DOWNLOAD_RETRIES {
        match client.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                return response
                    .text()
                    .await
                    .with_context(|| format!("Reading body of {url}"));
            }
            Ok(response) => {
                let status = response.status();
                last_error = Some(anyhow::anyhow!("HTTP {status} for {url}"));
                if attempt < DOWNLOAD_RETRIES {
                    warn!(
                        "HTTP {} for {}, retrying (attempt {}/{})",
                        status, url, attempt, DOWNLOAD_RETRIES
                    );
                }
            }
            Err(e) => {
                last_error = Some(anyhow::anyhow!("Request failed for {url}: {e}"));
                if attempt < DOWNLOAD_RETRIES {
                    warn!(
                        "Request failed for {}, retrying (attempt {}/{}): {}",
                        url, attempt, DOWNLOAD_RETRIES, e
                    );
                }
            }
        }
        if attempt < DOWNLOAD_RETRIES {
            tokio::time::sleep(std::time::Duration::from_secs(2u64.pow(attempt - 1))).await;
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("All download attempts failed for {url}")))
}

/// Download and rebuild the airport reference set, then refresh everything
/// derived from it: scrub self-loop routes from the ledger and regenerate
/// the presentation document with per-airport route lists.
pub async fn refresh_reference_data<R: SnapshotRepository>(
    client: &reqwest::Client,
    repo: &R,
    config: &AppConfig,
) -> Result<RefreshSummary> {
    info!("Downloading airport reference data");
    let countries_csv = download_text(client, COUNTRIES_URL).await?;
    let airports_csv = download_text(client, AIRPORTS_URL).await?;
    let airlines_dat = download_text(client, AIRLINES_URL).await?;

    let countries = parse_countries_csv(&countries_csv)?;
    let airports = parse_airports_csv(&airports_csv, &countries, &config.airport_continents)?;
    let airline_names = parse_airlines_dat(&airlines_dat);

    info!(
        "Loaded {} airports and {} airline names",
        airports.len(),
        airline_names.len()
    );
    repo.save_airports(&airports)?;

    // Reference reload is the moment to scrub routes inserted before the
    // self-loop check existed
    let mut ledger = RouteLedger::new(repo.load_routes()?);
    let scrubbed = ledger.scrub_self_loops();
    if scrubbed > 0 {
        warn!("Removed {} self-loop routes during reference reload", scrubbed);
        repo.save_routes(&ledger.to_routes())?;
    }

    let views = build_airport_views(&airports, &ledger, &airline_names);
    let route_count: usize = views.iter().map(|v| v.routes.len()).sum();
    repo.save_airport_views(&views)?;

    info!(
        "Rebuilt airports view: {} airports with {} routes",
        views.len(),
        route_count
    );
    Ok(RefreshSummary {
        airports: views.len(),
        routes: route_count,
    })
}

/// Attach each ledger route to its source airport, resolving carrier
/// prefixes to display names. Airports without outgoing routes are omitted.
pub fn build_airport_views(
    airports: &[Airport],
    ledger: &RouteLedger,
    airline_names: &HashMap<String, String>,
) -> Vec<AirportView> {
    let by_code: HashMap<&str, &Airport> =
        airports.iter().map(|a| (a.code.as_str(), a)).collect();

    let mut views: HashMap<&str, AirportView> = HashMap::new();
    for route in ledger.to_routes() {
        let (Some(source), Some(destination)) = (
            by_code.get(route.source.as_str()),
            by_code.get(route.destination.as_str()),
        ) else {
            // Route endpoints can fall outside the configured continents
            continue;
        };

        let airline = airline_names
            .get(&route.airline)
            .cloned()
            .unwrap_or_else(|| route.airline.clone());

        views
            .entry(source.code.as_str())
            .or_insert_with(|| AirportView::from_airport(source))
            .routes
            .push(RouteView {
                from: [source.lat, source.lon],
                to: [destination.lat, destination.lon],
                from_name: source.name.clone(),
                to_name: destination.name.clone(),
                airline,
                flight_number: route.flight_number.clone(),
            });
    }

    let mut views: Vec<AirportView> = views.into_values().collect();
    views.sort_by(|a, b| a.code.cmp(&b.code));
    views
}
