mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "skyroutes",
    about = "Infer air routes by correlating live aircraft positions with airports."
)]
struct Cli {
    /// Data directory for JSON snapshots (defaults to $DATA_DIR, then "public")
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        interface: String,
        /// Port to listen on (defaults to $PORT, then 8000)
        #[arg(long)]
        port: Option<u16>,
        /// Directory with the static frontend
        #[arg(long, default_value = "public")]
        public_dir: PathBuf,
    },
    /// Download reference data and rebuild the airports view
    UpdateAirports,
    /// Run one correlation cycle against the live state feed
    UpdateRoutes,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "public".to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);

    match cli.command {
        Commands::Serve {
            interface,
            port,
            public_dir,
        } => {
            let port = match port {
                Some(port) => port,
                None => env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
            };
            commands::handle_serve(interface, port, data_dir, public_dir).await
        }
        Commands::UpdateAirports => commands::handle_update_airports(data_dir).await,
        Commands::UpdateRoutes => commands::handle_update_routes(data_dir).await,
    }
}
