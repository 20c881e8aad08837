//! HTTP handlers and router.

use std::net::SocketAddr;
use std::sync::Arc;

use awp_protocol::decode_report;
use axum::{
    extract::{ConnectInfo, Extension},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::ingest::ingest_observations;
use crate::state::AppState;

/// Build the exporter router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/data/report/", get(report_handler))
        .route("/data/report/*rest", get(report_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

/// GET /data/report/<station> - Station report
///
/// Always answers 204. Decode problems, unusable values and mirror
/// failures only show up in the logs.
pub async fn report_handler(
    Extension(state): Extension<Arc<AppState>>,
    remote: Option<ConnectInfo<SocketAddr>>,
    uri: Uri,
) -> StatusCode {
    let report = decode_report(uri.path(), uri.query());

    let remote = remote
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_default();
    debug!(station = %report.station, remote = %remote, "AWP data received");

    for warning in &report.warnings {
        warn!(
            station = %report.station,
            error = %warning,
            "Failed to parse some query parameters, continuing with the rest"
        );
    }

    if state.mirror.is_enabled() {
        state
            .mirror
            .dispatch(report.station.clone(), report.observations.clone());
    }

    let summary = ingest_observations(&state.registry, &report.station, &report.observations);
    debug!(
        station = %report.station,
        recorded = summary.recorded,
        ignored = summary.ignored,
        skipped = summary.skipped,
        "Report ingested"
    );

    StatusCode::NO_CONTENT
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.registry.render(),
    )
}

/// GET /health - Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "awp-exporter"
    }))
}
