// Common test utilities and helpers

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    DecisionEngine, ExplainArchiver, GatewayClients, HistoryService, IoProbe, MemoryDecisionStore,
    QueryTracker, RoutingService, UrlRewriter,
};
use crate::{AppState, handlers};

/// Configuration pointing every backend at a closed local port so outbound
/// calls fail fast, with archiving disabled.
pub fn test_config() -> Config {
    let mut config = Config::default();
    for endpoints in [
        &mut config.clusters.ecs,
        &mut config.clusters.emr_standard,
        &mut config.clusters.emr_optimized,
    ] {
        endpoints.internal_url = "http://127.0.0.1:9".to_string();
    }
    config.explains.enabled = false;
    config.probe.timeout_secs = 1;
    config.proxy.data_timeout_secs = 2;
    config.proxy.routing_timeout_secs = 1;
    config
}

pub fn test_state() -> Arc<AppState> {
    test_state_with_config(test_config())
}

pub fn test_state_with_config(config: Config) -> Arc<AppState> {
    let config = Arc::new(config);

    let archiver = Arc::new(ExplainArchiver::new(&config.explains));
    let probe = Arc::new(IoProbe::new(&config, Arc::clone(&archiver)));
    let history_service =
        Arc::new(HistoryService::new(Arc::new(MemoryDecisionStore::new()), &config.history));
    let routing_service = Arc::new(RoutingService::new(
        Arc::clone(&history_service),
        probe,
        DecisionEngine::new(&config.decision),
    ));

    Arc::new(AppState {
        config: Arc::clone(&config),
        routing_service,
        history_service,
        query_tracker: Arc::new(QueryTracker::new()),
        url_rewriter: Arc::new(UrlRewriter::new(&config)),
        clients: Arc::new(GatewayClients::new(&config)),
    })
}

/// The same routing surface main() serves.
pub fn test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/v1/statement",
            post(handlers::statement::post_statement)
                .get(handlers::statement::get_statement_not_allowed),
        )
        .route("/v1/info", get(handlers::statement::trino_info))
        .route(
            "/loginType",
            get(handlers::statement::login_type).post(handlers::statement::login_type),
        )
        .route("/health", get(handlers::api::health))
        .route("/api/v1/route", post(handlers::api::route_query))
        .route("/api/v1/metrics", post(handlers::api::save_metrics))
        .fallback(handlers::proxy::proxy_any)
        .with_state(state)
}
