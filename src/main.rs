use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dyrasql::config::Config;
use dyrasql::services::{
    DecisionEngine, ExplainArchiver, GatewayClients, HistoryService, IoProbe, MemoryDecisionStore,
    QueryTracker, RoutingService, UrlRewriter,
};
use dyrasql::{AppState, handlers};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    let log_filter = tracing_subscriber::EnvFilter::new(&config.logging.level);
    let registry = tracing_subscriber::registry().with(log_filter);

    // Keep the appender guard alive for the process lifetime
    let mut _log_guard = None;
    if let Some(log_file) = &config.logging.file {
        let log_path = std::path::Path::new(log_file);
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        let log_dir = log_path.parent().and_then(|p| p.to_str()).unwrap_or("logs");
        let file_name = log_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("dyrasql.log");
        let file_prefix = file_name.strip_suffix(".log").unwrap_or(file_name);

        let file_appender = tracing_appender::rolling::daily(log_dir, file_prefix);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        _log_guard = Some(guard);
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(
        "dyrasql starting version={} bypass_mode={} streaming_threshold={}",
        env!("CARGO_PKG_VERSION"),
        config.proxy.bypass_mode,
        config.proxy.streaming_threshold
    );

    let config = Arc::new(config);

    let archiver = Arc::new(ExplainArchiver::new(&config.explains));
    let probe = Arc::new(IoProbe::new(&config, Arc::clone(&archiver)));

    let decision_store = Arc::new(MemoryDecisionStore::new());
    let history_service = Arc::new(HistoryService::new(decision_store, &config.history));

    let decision_engine = DecisionEngine::new(&config.decision);
    let routing_service = Arc::new(RoutingService::new(
        Arc::clone(&history_service),
        Arc::clone(&probe),
        decision_engine,
    ));

    let query_tracker = Arc::new(QueryTracker::new());
    let url_rewriter = Arc::new(UrlRewriter::new(&config));
    let clients = Arc::new(GatewayClients::new(&config));

    let app_state = Arc::new(AppState {
        config: Arc::clone(&config),
        routing_service,
        history_service,
        query_tracker,
        url_rewriter,
        clients,
    });

    let app = Router::new()
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
        .with_state(app_state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("dyrasql is ready to serve requests");

    axum::serve(listener, app).await?;

    tracing::info!("dyrasql shutting down");
    Ok(())
}
