use anyhow::Result;
use chrono::Utc;
use std::path::PathBuf;
use tracing::info;

use skyroutes::config::AppConfig;
use skyroutes::correlator::RouteCorrelator;
use skyroutes::instance_lock::InstanceLock;
use skyroutes::opensky_client;
use skyroutes::snapshot_repo::JsonSnapshotRepository;

pub async fn handle_update_routes(data_dir: PathBuf) -> Result<()> {
    let _lock = InstanceLock::acquire(&data_dir)?;

    let config = AppConfig::load(&data_dir);
    let client = reqwest::Client::new();
    let reports =
        opensky_client::fetch_position_reports(&client, config.flight_bounding_box()).await?;

    let repo = JsonSnapshotRepository::new(&data_dir);
    let stats = RouteCorrelator::new(&repo).run_cycle(&reports, Utc::now())?;
    info!(
        "Route update complete: {} routes, {} active flights, {} removed",
        stats.routes, stats.active_planes, stats.removed_last_run
    );
    Ok(())
}
