//! Header plumbing between the axum surface and the reqwest backends.
//!
//! The two stacks pin different versions of the `http` crate, so headers are
//! converted by name/bytes rather than moved. Hop-by-hop headers are dropped
//! in both directions; `content-length` is dropped on responses because
//! bodies are re-framed after URL rewriting.

use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Response headers never forwarded to the client.
const STRIPPED_RESPONSE_HEADERS: [&str; 4] =
    ["connection", "transfer-encoding", "content-encoding", "content-length"];

/// Request headers never forwarded to a backend.
const STRIPPED_REQUEST_HEADERS: [&str; 4] =
    ["host", "content-length", "connection", "transfer-encoding"];

/// Copy backend response headers into a client response, minus hop-by-hop
/// framing headers.
pub fn sanitize_response_headers(upstream: &reqwest::header::HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in upstream.iter() {
        if STRIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_str().as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }
    headers
}

/// Copy client request headers toward a backend, minus hop-by-hop headers,
/// forcing identity encoding so bodies stay rewritable.
pub fn forward_request_headers(incoming: &HeaderMap) -> reqwest::header::HeaderMap {
    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in incoming.iter() {
        if STRIPPED_REQUEST_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }
    headers.insert(
        reqwest::header::ACCEPT_ENCODING,
        reqwest::header::HeaderValue::from_static("identity"),
    );
    headers
}

/// Content type of a backend response, defaulting to JSON as the statement
/// protocol does.
pub fn response_content_type(upstream: &reqwest::header::HeaderMap) -> String {
    upstream
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json")
        .to_string()
}
