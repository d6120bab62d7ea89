use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info};

use crate::config::{AppConfig, CONTINENTS};
use crate::correlator::RouteCorrelator;
use crate::loader;
use crate::opensky_client;
use crate::snapshot_repo::{
    ACTIVE_FLIGHTS_FILE, AIRPORTS_VIEW_FILE, JsonSnapshotRepository, ROUTES_FILE,
    SnapshotRepository,
};
use crate::web::AppState;

pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Serve a JSON document from the data directory, with a fallback body for
/// documents that have not been written yet.
fn serve_json_file(state: &AppState, name: &str, fallback: &'static str) -> Response {
    let body = std::fs::read_to_string(state.data_dir.join(name))
        .unwrap_or_else(|_| fallback.to_string());
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    (StatusCode::OK, headers, body).into_response()
}

/// GET /airports.json - the presentation document with per-airport routes.
pub async fn get_airports_view(State(state): State<AppState>) -> Response {
    serve_json_file(&state, AIRPORTS_VIEW_FILE, "[]")
}

/// GET /routes-db - the raw route ledger.
pub async fn get_routes_db(State(state): State<AppState>) -> Response {
    serve_json_file(&state, ROUTES_FILE, "[]")
}

/// GET /active-planes - the active-flight map.
pub async fn get_active_planes(State(state): State<AppState>) -> Response {
    serve_json_file(&state, ACTIVE_FLIGHTS_FILE, "{}")
}

/// GET /routes-stats - statistics from the last completed cycle.
pub async fn get_routes_stats(State(state): State<AppState>) -> Response {
    let repo = JsonSnapshotRepository::new(&state.data_dir);
    match repo.load_stats() {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!("Failed to load stats: {e:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load stats")
        }
    }
}

/// GET /info - dashboard summary derived from the stats snapshot.
pub async fn get_info(State(state): State<AppState>) -> Response {
    let repo = JsonSnapshotRepository::new(&state.data_dir);
    match repo.load_stats() {
        Ok(stats) => Json(json!({
            "routes": stats.routes,
            "last_run": stats.last_run,
            "active_planes": stats.active_planes,
            "removed_last_hour": stats.removed_last_run,
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to load stats: {e:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to load stats")
        }
    }
}

/// POST /update-routes - run one correlation cycle against the live feed.
///
/// Cycles are mutually exclusive: a concurrent trigger gets a 409 rather
/// than racing the running cycle's read-modify-write.
pub async fn update_routes(State(state): State<AppState>) -> Response {
    let Ok(_guard) = state.cycle_lock.try_lock() else {
        return json_error(StatusCode::CONFLICT, "An update cycle is already running");
    };

    let config = AppConfig::load(&state.data_dir);
    let reports =
        match opensky_client::fetch_position_reports(&state.client, config.flight_bounding_box())
            .await
        {
            Ok(reports) => reports,
            Err(e) => {
                error!("State feed fetch failed: {e:#}");
                return json_error(StatusCode::BAD_GATEWAY, "State feed fetch failed");
            }
        };

    let repo = JsonSnapshotRepository::new(&state.data_dir);
    match RouteCorrelator::new(&repo).run_cycle(&reports, Utc::now()) {
        Ok(stats) => Json(json!({
            "routes": stats.routes,
            "last_run": stats.last_run,
            "active_planes": stats.active_planes,
            "removed_last_run": stats.removed_last_run,
        }))
        .into_response(),
        Err(e) => {
            error!("Correlation cycle failed: {e:#}");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "Correlation cycle failed")
        }
    }
}

/// POST /update-airports - redownload reference data and rebuild everything
/// derived from it.
pub async fn update_airports(State(state): State<AppState>) -> Response {
    let Ok(_guard) = state.cycle_lock.try_lock() else {
        return json_error(StatusCode::CONFLICT, "An update cycle is already running");
    };

    let config = AppConfig::load(&state.data_dir);
    let repo = JsonSnapshotRepository::new(&state.data_dir);
    match loader::refresh_reference_data(&state.client, &repo, &config).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            error!("Reference data refresh failed: {e:#}");
            json_error(StatusCode::BAD_GATEWAY, "Reference data refresh failed")
        }
    }
}

/// Reject names that could escape the data directory.
fn sanitize_file_name(name: &str) -> Option<&str> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.starts_with('.')
    {
        return None;
    }
    Some(name)
}

/// Record count shown in the admin file listing: array length or object key
/// count for JSON documents, absent for everything else.
fn record_count(path: &std::path::Path) -> Option<usize> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<serde_json::Value>(&contents).ok()? {
        serde_json::Value::Array(items) => Some(items.len()),
        serde_json::Value::Object(map) => Some(map.len()),
        _ => None,
    }
}

/// GET /admin/files - data directory listing with sizes and record counts.
pub async fn admin_list_files(State(state): State<AppState>) -> Response {
    let entries = match std::fs::read_dir(&state.data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!("Failed to list data directory: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to list files");
        }
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        files.push(json!({
            "name": name,
            "size": metadata.len(),
            "records": record_count(&entry.path()),
        }));
    }
    files.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

    Json(json!({ "files": files })).into_response()
}

/// GET /admin/download/{name}
pub async fn admin_download_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let Some(name) = sanitize_file_name(&name) else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid file name");
    };

    match std::fs::read(state.data_dir.join(name)) {
        Ok(contents) => {
            let mut headers = HeaderMap::new();
            let content_type = mime_guess::from_path(name).first_or_octet_stream();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_str(content_type.as_ref())
                    .unwrap_or(HeaderValue::from_static("application/octet-stream")),
            );
            (StatusCode::OK, headers, contents).into_response()
        }
        Err(_) => json_error(StatusCode::NOT_FOUND, "File not found"),
    }
}

/// POST /admin/upload/{name} - multipart upload into the data directory.
pub async fn admin_upload_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let Some(name) = sanitize_file_name(&name) else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid file name");
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to read upload body: {e}");
                return json_error(StatusCode::BAD_REQUEST, "Failed to read upload");
            }
        };

        if let Err(e) = std::fs::create_dir_all(&state.data_dir)
            .and_then(|_| std::fs::write(state.data_dir.join(name), &data))
        {
            error!("Failed to write uploaded file {name}: {e}");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to write file");
        }

        info!("Uploaded {} ({} bytes)", name, data.len());
        return Json(json!({ "name": name, "size": data.len() })).into_response();
    }

    json_error(StatusCode::BAD_REQUEST, "No file in upload")
}

/// DELETE /admin/delete/{name}
pub async fn admin_delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let Some(name) = sanitize_file_name(&name) else {
        return json_error(StatusCode::BAD_REQUEST, "Invalid file name");
    };

    match std::fs::remove_file(state.data_dir.join(name)) {
        Ok(()) => {
            info!("Deleted {}", name);
            Json(json!({ "deleted": name })).into_response()
        }
        Err(_) => json_error(StatusCode::NOT_FOUND, "File not found"),
    }
}

/// GET /admin/config - current config plus the known continent table.
pub async fn admin_get_config(State(state): State<AppState>) -> Response {
    let config = AppConfig::load(&state.data_dir);
    let continents: Vec<_> = CONTINENTS
        .iter()
        .map(|c| json!({ "code": c.code, "name": c.name }))
        .collect();
    Json(json!({ "continents": continents, "config": config })).into_response()
}

/// POST /admin/config - validate and persist a new config document.
pub async fn admin_set_config(
    State(state): State<AppState>,
    Json(config): Json<AppConfig>,
) -> Response {
    if let Err(e) = config.validate() {
        return json_error(StatusCode::BAD_REQUEST, &e.to_string());
    }
    if let Err(e) = config.save(&state.data_dir) {
        error!("Failed to save config: {e:#}");
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save config");
    }
    Json(config).into_response()
}
