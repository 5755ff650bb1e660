//! Statement submission endpoints: `POST /v1/statement` plus the small
//! protocol endpoints JDBC clients expect around it (`/v1/info`,
//! `/loginType`, and the 405 for GET submissions).

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use std::sync::Arc;

use crate::AppState;
use crate::models::ClusterName;
use crate::services::QueryAnalyzer;
use crate::utils::http::{response_content_type, sanitize_response_headers};
use crate::utils::{ApiError, ApiResult};

/// Trino headers copied from the client onto the forwarded submission.
const PASSTHROUGH_HEADERS: [&str; 4] =
    ["x-trino-catalog", "x-trino-schema", "x-trino-source", "x-trino-client-info"];

/// Route and forward one statement submission.
pub async fn post_statement(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    let query = String::from_utf8(body.to_vec())
        .map_err(|_| ApiError::invalid_request("SQL query must be valid UTF-8"))?;
    let user = headers
        .get("x-trino-user")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("admin")
        .to_string();

    if query.trim().is_empty() {
        tracing::warn!("statement_request empty_query user={}", user);
        return Err(ApiError::invalid_request("SQL query is required"));
    }

    // Keep-alives bypass the whole decision machinery
    let is_keepalive = QueryAnalyzer::is_keepalive(&query);
    let cluster = if is_keepalive {
        tracing::debug!("statement_routing reason=keepalive cluster={}", ClusterName::Ecs);
        ClusterName::Ecs
    } else {
        let preview: String = query.chars().take(100).collect();
        tracing::info!(
            "statement_request user={} query_preview={}",
            user,
            preview.replace('\n', " ")
        );
        let decision = state.routing_service.route(&query).await;
        tracing::info!(
            "statement_routing cached={} cluster={} score={:.3}",
            decision.cached,
            decision.cluster,
            decision.score
        );
        decision.cluster
    };

    let cluster_url = state.config.clusters.internal_url(cluster);
    tracing::info!(
        "statement_execute cluster={} url={} bypass={}",
        cluster,
        cluster_url,
        state.config.proxy.bypass_mode
    );

    let mut outbound_headers = reqwest::header::HeaderMap::new();
    outbound_headers
        .insert(reqwest::header::CONTENT_TYPE, reqwest::header::HeaderValue::from_static("text/plain"));
    outbound_headers.insert(
        reqwest::header::ACCEPT_ENCODING,
        reqwest::header::HeaderValue::from_static("identity"),
    );
    if let Ok(value) = reqwest::header::HeaderValue::from_str(&user) {
        outbound_headers.insert("x-trino-user", value);
    }
    for name in PASSTHROUGH_HEADERS {
        if let Some(value) = headers.get(name)
            && let Ok(value) = reqwest::header::HeaderValue::from_bytes(value.as_bytes())
            && let Ok(name) = reqwest::header::HeaderName::from_bytes(name.as_bytes())
        {
            outbound_headers.insert(name, value);
        }
    }

    let client = if is_keepalive { &state.clients.keepalive } else { &state.clients.data };
    let response = client
        .post(format!("{}/v1/statement", cluster_url))
        .headers(outbound_headers)
        .body(query)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                tracing::warn!("statement_execute timeout cluster={}", cluster);
                ApiError::upstream_timeout("Query execution timeout")
            } else {
                ApiError::internal_error("Query execution failed").with_message(e.to_string())
            }
        })?;

    let status = response.status();
    tracing::info!("statement_response cluster={} status={}", cluster, status);

    let upstream_headers = response.headers().clone();
    let content = response
        .text()
        .await
        .map_err(|e| ApiError::internal_error("Query execution failed").with_message(e.to_string()))?;

    // The tracker entry must exist before the client sees the response, or
    // its first nextUri poll could race and fall back to the default cluster.
    if let Ok(envelope) = serde_json::from_str::<Value>(&content)
        && let Some(query_id) = envelope.get("id").and_then(Value::as_str)
    {
        state.query_tracker.put(query_id, cluster);
    }

    let rewritten = state.url_rewriter.rewrite(&content, cluster);

    let mut builder = Response::builder()
        .status(StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY));
    if let Some(headers) = builder.headers_mut() {
        headers.extend(sanitize_response_headers(&upstream_headers));
        headers.insert(
            header::CONTENT_TYPE,
            response_content_type(&upstream_headers).parse().unwrap_or_else(|_| {
                axum::http::HeaderValue::from_static("application/json")
            }),
        );
    }

    builder
        .body(Body::from(rewritten))
        .map_err(|e| ApiError::internal_error("Query execution failed").with_message(e.to_string()))
}

/// Some JDBC clients send GET before POST.
pub async fn get_statement_not_allowed() -> ApiError {
    ApiError::method_not_allowed("Method not allowed. Use POST /v1/statement to execute queries.")
}

/// `/v1/info` proxied to the default backend, with a static coordinator
/// body when it is unreachable so drivers can still complete their handshake.
pub async fn trino_info(State(state): State<Arc<AppState>>) -> Response {
    let url = format!("{}/v1/info", state.config.clusters.ecs.internal_url);

    let attempt = state
        .clients
        .control
        .get(&url)
        .header(reqwest::header::ACCEPT_ENCODING, "identity")
        .send()
        .await;

    match attempt {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status().as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let upstream_headers = response.headers().clone();
            let content_type = response_content_type(&upstream_headers);
            let body = response.bytes().await.unwrap_or_default();

            let mut builder = Response::builder().status(status);
            if let Some(headers) = builder.headers_mut() {
                headers.extend(sanitize_response_headers(&upstream_headers));
                headers.insert(
                    header::CONTENT_TYPE,
                    content_type.parse().unwrap_or_else(|_| {
                        axum::http::HeaderValue::from_static("application/json")
                    }),
                );
            }
            builder.body(Body::from(body)).unwrap_or_else(|_| fallback_info())
        },
        Err(e) => {
            tracing::warn!("trino_info proxy_failed error={}", e);
            fallback_info()
        },
    }
}

fn fallback_info() -> Response {
    let body = json!({
        "nodeId": "dyrasql-core",
        "state": "ACTIVE",
        "nodeVersion": {"version": "478"},
        "environment": "production",
        "coordinator": true,
    });
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("static info response")
}

/// No authentication on the trusted network.
pub async fn login_type() -> Json<Value> {
    Json(json!({ "supportedTypes": [] }))
}

// Used by the proxy fallback, which answers loginType on any path shape the
// driver tries.
pub fn login_type_body() -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "supportedTypes": [] }).to_string()))
        .expect("static loginType response")
}
