use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use crate::tests::common::{test_router, test_state};

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_service_and_mode() {
    let router = test_router(test_state());
    let response = router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "dyrasql");
    assert_eq!(json["bypass_mode"], true);
    assert_eq!(json["streaming_threshold"], 65536);
}

#[tokio::test]
async fn test_get_statement_is_method_not_allowed() {
    let router = test_router(test_state());
    let response = router
        .oneshot(Request::builder().uri("/v1/statement").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("POST /v1/statement"));
}

#[tokio::test]
async fn test_empty_statement_rejected() {
    let router = test_router(test_state());
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/statement")
                .header("content-type", "text/plain")
                .body(Body::from("   "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "SQL query is required");
}

#[tokio::test]
async fn test_login_type_reports_no_auth() {
    let state = test_state();
    for method in ["GET", "POST"] {
        let response = test_router(state.clone())
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/loginType")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["supportedTypes"], serde_json::json!([]));
    }
}

#[tokio::test]
async fn test_route_endpoint_returns_decision_with_urls() {
    let state = test_state();
    let router = test_router(state.clone());

    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/route")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query": "SHOW TABLES FROM foo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["cluster"], "ecs");
    assert_eq!(json["cached"], false);
    assert_eq!(json["score"], 0.0);
    assert_eq!(json["cluster_url"], "http://127.0.0.1:9");
    assert_eq!(json["cluster_external_url"], "http://localhost:8081");
    assert_eq!(json["fingerprint"].as_str().unwrap().len(), 64);

    // Same statement again: decision comes from the cache
    let response = test_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/route")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query": "SHOW TABLES FROM foo"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["cached"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_feeds_historical_factor() {
    let state = test_state();

    // Establish a decision first so metrics have something to attach to
    let decision = state.routing_service.route("SELECT * FROM sales.orders").await;

    let body = serde_json::json!({
        "fingerprint": decision.fingerprint,
        "metrics": {"execution_time": 42.0, "cost": 1.5, "success": false}
    });
    let response = test_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/metrics")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");

    // A failed execution inverts the stored score
    let factor = state.history_service.historical_factor(&decision.fingerprint).await;
    assert!((factor - (1.0 - decision.score)).abs() < 1e-9);
}

#[tokio::test]
async fn test_unreachable_backend_surfaces_internal_error() {
    // Keep-alive forwards straight to the (closed) default backend
    let response = test_router(test_state())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/statement")
                .body(Body::from("SELECT 1"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Query execution failed");
}

#[tokio::test]
async fn test_follow_up_with_unknown_backend_fails_without_panic() {
    let response = test_router(test_state())
        .oneshot(
            Request::builder()
                .uri("/v1/statement/executing/20240131_104500_00042_abcde/yf/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Closed backend port: the proxy reports the failure as its own error
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
