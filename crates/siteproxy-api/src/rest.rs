//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use siteproxy_core::{ProxyError, SiteConnections, SiteHealth, SiteQueues, SiteStatus};
use siteproxy_monitor::SiteMonitor;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub monitor: Arc<SiteMonitor>,
    pub started: Instant,
}

type ApiError = (StatusCode, String);

/// Create the API router
pub fn create_router(monitor: Arc<SiteMonitor>) -> Router {
    let state = Arc::new(AppState {
        monitor,
        started: Instant::now(),
    });

    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/sites", get(list_sites))
        .route("/api/sites/best", get(get_best_site))
        .route("/api/sites/:site/health", get(get_site_health))
        .route("/api/sites/:site/queues", get(get_site_queues))
        .route("/api/sites/:site/connections", get(get_site_connections))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_error(err: ProxyError) -> ApiError {
    let status = match err {
        ProxyError::SiteNotFound(_) => StatusCode::NOT_FOUND,
        ProxyError::NoSites => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = %status, error = %err, "Request failed");
    (status, err.to_string())
}

/// System status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub sites: usize,
}

/// Get system status
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_secs: state.started.elapsed().as_secs(),
        sites: state.monitor.registry().len(),
    })
}

/// List the last known status of every site
async fn list_sites(State(state): State<Arc<AppState>>) -> Json<Vec<SiteStatus>> {
    Json(state.monitor.all_sites_status().await)
}

/// Run a selection round and return the chosen site
async fn get_best_site(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SiteStatus>, ApiError> {
    let site = state
        .monitor
        .get_available_site()
        .await
        .map_err(api_error)?;

    info!(site = %site.name, score = site.score, "Served best site");
    Ok(Json(site))
}

/// Probe one site and return its health
async fn get_site_health(
    State(state): State<Arc<AppState>>,
    Path(site): Path<String>,
) -> Result<Json<SiteHealth>, ApiError> {
    state.monitor.site_health(&site).await.map(Json).map_err(api_error)
}

/// Probe one site and return its queue depth
async fn get_site_queues(
    State(state): State<Arc<AppState>>,
    Path(site): Path<String>,
) -> Result<Json<SiteQueues>, ApiError> {
    state.monitor.site_queues(&site).await.map(Json).map_err(api_error)
}

/// Probe one site and return its connection count
async fn get_site_connections(
    State(state): State<Arc<AppState>>,
    Path(site): Path<String>,
) -> Result<Json<SiteConnections>, ApiError> {
    state
        .monitor
        .site_connections(&site)
        .await
        .map(Json)
        .map_err(api_error)
}
