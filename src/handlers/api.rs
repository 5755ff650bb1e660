//! Internal API: health, sidecar routing decisions, post-execution metrics.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;
use crate::models::{MetricsRequest, RouteRequest, RouteResponse};
use crate::utils::ApiResult;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "dyrasql",
        "version": env!("CARGO_PKG_VERSION"),
        "bypass_mode": state.config.proxy.bypass_mode,
        "streaming_threshold": state.config.proxy.streaming_threshold,
    }))
}

/// Routing decision without forwarding, for sibling services that submit
/// statements themselves.
pub async fn route_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RouteRequest>,
) -> ApiResult<Json<RouteResponse>> {
    let preview: String = request.query.chars().take(80).collect();
    tracing::info!("route_request query_preview={}", preview.replace('\n', " "));

    let decision = state.routing_service.route(&request.query).await;

    Ok(Json(RouteResponse {
        cluster_url: state.config.clusters.internal_url(decision.cluster).to_string(),
        cluster_external_url: state.config.clusters.external_url(decision.cluster).to_string(),
        fingerprint: decision.fingerprint,
        cluster: decision.cluster,
        score: decision.score,
        factors: decision.factors,
        cached: decision.cached,
    }))
}

/// Post-execution metrics reported back by executors; feeds the historical
/// factor of future decisions.
pub async fn save_metrics(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MetricsRequest>,
) -> ApiResult<Json<Value>> {
    let metrics = request.metrics.unwrap_or_default();
    state.history_service.record_metrics(&request.fingerprint, metrics).await;

    Ok(Json(json!({
        "status": "success",
        "message": "Metrics saved successfully",
    })))
}
