use serde::{Deserialize, Serialize};

use super::{ClusterName, ExecutionMetrics, Factors};

/// Body of `POST /api/v1/route`: a routing decision without forwarding.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteRequest {
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RouteResponse {
    pub fingerprint: String,
    pub cluster: ClusterName,
    pub score: f64,
    pub factors: Factors,
    pub cached: bool,
    pub cluster_url: String,
    pub cluster_external_url: String,
}

/// Body of `POST /api/v1/metrics`: post-execution outcome for a fingerprint.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsRequest {
    pub fingerprint: String,
    #[serde(default)]
    pub metrics: Option<ExecutionMetrics>,
}
