use anyhow::Result;
use std::path::PathBuf;

use skyroutes::instance_lock::InstanceLock;
use skyroutes::web;

pub async fn handle_serve(
    interface: String,
    port: u16,
    data_dir: PathBuf,
    public_dir: PathBuf,
) -> Result<()> {
    // Held for the lifetime of the server; cycles triggered over HTTP are
    // additionally serialized by the in-process run-lock
    let _lock = InstanceLock::acquire(&data_dir)?;
    web::start_web_server(interface, port, data_dir, public_dir).await
}
