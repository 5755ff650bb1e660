//! Catch-all proxy for statement follow-ups, cancellations and UI assets.
//!
//! The cluster is resolved from the query id embedded in the path; paths
//! without a known id fall back to the default cluster. GET responses are
//! streamed unless they are small JSON documents, which are buffered so
//! their `nextUri` links can be rewritten.

use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, header};
use axum::response::Response;
use std::sync::Arc;

use crate::AppState;
use crate::handlers::statement::login_type_body;
use crate::models::ClusterName;
use crate::utils::http::{forward_request_headers, response_content_type, sanitize_response_headers};
use crate::utils::{ApiError, ApiResult};

/// Paths served by the UI gateway rather than a query cluster.
fn is_ui_request(path: &str) -> bool {
    path.is_empty()
        || path.starts_with("ui/")
        || path.starts_with("assets/")
        || path.starts_with("vendor/")
        || path.ends_with(".html")
        || path.ends_with(".css")
        || path.ends_with(".js")
        || path.ends_with(".ico")
}

pub async fn proxy_any(State(state): State<Arc<AppState>>, request: Request) -> ApiResult<Response> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let headers = request.headers().clone();

    let path = uri.path().to_string();
    let relative_path = path.trim_start_matches('/').to_string();
    let path_and_query =
        uri.path_and_query().map(|pq| pq.as_str().to_string()).unwrap_or_else(|| path.clone());

    tracing::debug!(
        "proxy_request method={} path={}",
        method,
        &relative_path.chars().take(60).collect::<String>()
    );

    if relative_path.trim_matches('/') == "loginType" {
        return Ok(login_type_body());
    }

    // UI traffic goes to the UI gateway when one is configured; a failure
    // there falls through to the resolved cluster.
    if method == Method::GET
        && is_ui_request(&relative_path)
        && let Some(gateway_url) = &state.config.proxy.ui_gateway_url
    {
        let target = format!("{}/{}", gateway_url, path_and_query.trim_start_matches('/'));
        tracing::debug!("proxy_ui_redirect url={}", target);

        match state
            .clients
            .control
            .get(&target)
            .header(reqwest::header::ACCEPT_ENCODING, "identity")
            .send()
            .await
        {
            Ok(response) => {
                let status = StatusCode::from_u16(response.status().as_u16())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                let upstream_headers = response.headers().clone();
                let body = response.bytes().await.unwrap_or_default();
                return buffered_response(status, &upstream_headers, Body::from(body));
            },
            Err(e) => {
                tracing::warn!("proxy_ui_redirect_failed fallback_to_cluster error={}", e);
            },
        }
    }

    let cluster = state.query_tracker.cluster_for_path(&path);
    let cluster_url = state.config.clusters.internal_url(cluster);
    let target = format!("{}{}", cluster_url, path_and_query);
    let outbound_headers = forward_request_headers(&headers);

    if method == Method::GET {
        return proxy_get(&state, cluster, &target, outbound_headers).await;
    }

    let reqwest_method = match method.as_str() {
        "POST" => reqwest::Method::POST,
        "PUT" => reqwest::Method::PUT,
        "DELETE" => reqwest::Method::DELETE,
        "HEAD" => reqwest::Method::HEAD,
        "OPTIONS" => reqwest::Method::OPTIONS,
        other => {
            return Err(ApiError::method_not_allowed(format!("Method {} not allowed", other)));
        },
    };

    let body = if method == Method::POST || method == Method::PUT {
        to_bytes(request.into_body(), usize::MAX)
            .await
            .map_err(|e| ApiError::internal_error("Proxy request failed").with_message(e.to_string()))?
    } else {
        Default::default()
    };

    let response = state
        .clients
        .data
        .request(reqwest_method, &target)
        .headers(outbound_headers)
        .body(body)
        .send()
        .await
        .map_err(|e| proxy_error(e, &path))?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let upstream_headers = response.headers().clone();
    let content = response
        .text()
        .await
        .map_err(|e| ApiError::internal_error("Proxy request failed").with_message(e.to_string()))?;

    // Control responses are small; rewrite them unconditionally
    let rewritten = state.url_rewriter.rewrite(&content, cluster);
    buffered_response(status, &upstream_headers, Body::from(rewritten))
}

/// Follow-up data fetches: buffer-and-rewrite small JSON, stream the rest.
async fn proxy_get(
    state: &AppState,
    cluster: ClusterName,
    target: &str,
    outbound_headers: reqwest::header::HeaderMap,
) -> ApiResult<Response> {
    let response = state
        .clients
        .data
        .get(target)
        .headers(outbound_headers)
        .send()
        .await
        .map_err(|e| proxy_error(e, target))?;

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let upstream_headers = response.headers().clone();
    let content_type = response_content_type(&upstream_headers);

    let content_length = upstream_headers
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let needs_rewrite = content_type.contains("application/json")
        && content_length.is_some_and(|len| len < state.config.proxy.streaming_threshold);

    if needs_rewrite {
        let content = response.text().await.map_err(|e| {
            ApiError::internal_error("Proxy request failed").with_message(e.to_string())
        })?;
        let rewritten = state.url_rewriter.rewrite(&content, cluster);
        return buffered_response(status, &upstream_headers, Body::from(rewritten));
    }

    // Large or non-JSON bodies stream through without being held in memory
    buffered_response(status, &upstream_headers, Body::from_stream(response.bytes_stream()))
}

fn proxy_error(error: reqwest::Error, context: &str) -> ApiError {
    if error.is_timeout() {
        tracing::warn!(
            "proxy_timeout path={}",
            context.chars().take(60).collect::<String>()
        );
        ApiError::upstream_timeout("Request timeout")
    } else {
        ApiError::internal_error("Proxy request failed").with_message(error.to_string())
    }
}

fn buffered_response(
    status: StatusCode,
    upstream_headers: &reqwest::header::HeaderMap,
    body: Body,
) -> ApiResult<Response> {
    let mut builder = Response::builder().status(status);
    if let Some(headers) = builder.headers_mut() {
        headers.extend(sanitize_response_headers(upstream_headers));
        headers.insert(
            header::CONTENT_TYPE,
            response_content_type(upstream_headers)
                .parse()
                .unwrap_or_else(|_| axum::http::HeaderValue::from_static("application/json")),
        );
    }
    builder
        .body(body)
        .map_err(|e| ApiError::internal_error("Proxy request failed").with_message(e.to_string()))
}
