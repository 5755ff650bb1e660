use crate::models::ClusterName;
use crate::tests::common::test_state;

#[tokio::test]
async fn test_metadata_statement_forced_to_ecs() {
    let state = test_state();
    let decision = state.routing_service.route("SHOW TABLES FROM foo").await;

    assert_eq!(decision.cluster, ClusterName::Ecs);
    assert_eq!(decision.score, 0.0);
    assert_eq!(decision.factors.volume, 0.0);
    assert_eq!(decision.factors.complexity, 0.0);
    assert_eq!(decision.factors.historical, 0.0);
    assert!(!decision.cached);

    // The forced decision is persisted like any other
    let record = state.history_service.lookup(&decision.fingerprint).await.expect("persisted");
    assert_eq!(record.cluster, ClusterName::Ecs);
}

#[tokio::test]
async fn test_unreachable_probe_degrades_to_complexity_only() {
    let state = test_state();
    // The probe backend is a closed port, so the volume factor must be neutral
    let decision = state
        .routing_service
        .route("SELECT * FROM sales.orders WHERE date >= DATE '2024-01-01'")
        .await;

    assert_eq!(decision.factors.volume, 0.5);
    assert_eq!(decision.factors.historical, 0.5);
    assert!(decision.score >= 0.0 && decision.score <= 1.0);
    assert!(!decision.cached);
}

#[tokio::test]
async fn test_second_route_hits_cache() {
    let state = test_state();
    let sql = "SELECT * FROM sales.orders WHERE id = 42";

    let first = state.routing_service.route(sql).await;
    assert!(!first.cached);

    let second = state.routing_service.route(sql).await;
    assert!(second.cached);
    assert_eq!(second.cluster, first.cluster);
    assert_eq!(second.score, first.score);
    assert_eq!(second.fingerprint, first.fingerprint);
}

#[tokio::test]
async fn test_fingerprint_equivalent_statements_share_decisions() {
    let state = test_state();

    let first = state.routing_service.route("SELECT * FROM t WHERE id = 1").await;
    // Different literal and formatting, same fingerprint: served from cache
    let second = state.routing_service.route("select  *  from t where id = 999").await;

    assert_eq!(first.fingerprint, second.fingerprint);
    assert!(second.cached);
    assert_eq!(second.cluster, first.cluster);
}

#[tokio::test]
async fn test_keepalive_not_special_cased_by_analyzer_route() {
    // Keep-alive handling lives in the statement handler; the routing
    // service itself scores SELECT 1 like any other statement.
    let state = test_state();
    let decision = state.routing_service.route("SELECT 1").await;
    assert!(decision.score <= 1.0);
}
