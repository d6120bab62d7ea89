use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use skyroutes::config::AppConfig;
use skyroutes::instance_lock::InstanceLock;
use skyroutes::loader;
use skyroutes::snapshot_repo::JsonSnapshotRepository;

pub async fn handle_update_airports(data_dir: PathBuf) -> Result<()> {
    let _lock = InstanceLock::acquire(&data_dir)?;

    let config = AppConfig::load(&data_dir);
    let repo = JsonSnapshotRepository::new(&data_dir);
    let client = reqwest::Client::new();

    let summary = loader::refresh_reference_data(&client, &repo, &config).await?;
    info!(
        "Reference data refreshed: {} airports, {} routes",
        summary.airports, summary.routes
    );
    Ok(())
}
