use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use crate::actions;

/// Shared state for all handlers. The cycle lock serializes the update
/// endpoints: a correlation cycle is a read-modify-write over the whole
/// snapshot set, so only one may run at a time.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub client: reqwest::Client,
    pub cycle_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            client: reqwest::Client::new(),
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }
}

async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start_time = Instant::now();

    let response = next.run(request).await;

    info!(
        "{} {} {} in {:.2}ms",
        method,
        path,
        response.status().as_u16(),
        start_time.elapsed().as_secs_f64() * 1000.0
    );

    response
}

/// Build the application router. API routes take precedence; anything else
/// falls through to the static frontend.
pub fn build_router(state: AppState, public_dir: PathBuf) -> Router {
    Router::new()
        .route("/airports.json", get(actions::get_airports_view))
        .route("/routes-db", get(actions::get_routes_db))
        .route("/routes-stats", get(actions::get_routes_stats))
        .route("/active-planes", get(actions::get_active_planes))
        .route("/info", get(actions::get_info))
        .route("/update-airports", post(actions::update_airports))
        .route("/update-routes", post(actions::update_routes))
        .route("/admin/files", get(actions::admin_list_files))
        .route("/admin/download/{name}", get(actions::admin_download_file))
        .route("/admin/upload/{name}", post(actions::admin_upload_file))
        .route("/admin/delete/{name}", delete(actions::admin_delete_file))
        .route(
            "/admin/config",
            get(actions::admin_get_config).post(actions::admin_set_config),
        )
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
}

pub async fn start_web_server(
    interface: String,
    port: u16,
    data_dir: PathBuf,
    public_dir: PathBuf,
) -> Result<()> {
    let state = AppState::new(data_dir);
    let app = build_router(state, public_dir);

    let listener = tokio::net::TcpListener::bind(format!("{interface}:{port}")).await?;
    info!("Web server listening on http://{interface}:{port}");

    axum::serve(listener, app).await?;
    Ok(())
}
