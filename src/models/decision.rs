use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ClusterName;

/// The three normalized inputs to a routing score, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Factors {
    pub volume: f64,
    pub complexity: f64,
    pub historical: f64,
}

impl Factors {
    pub const ZERO: Factors = Factors { volume: 0.0, complexity: 0.0, historical: 0.0 };
}

/// Result of running the decision algorithm for one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub cluster: ClusterName,
    pub score: f64,
    pub factors: Factors,
}

impl Decision {
    /// Forced decision for statements that skip the scoring machinery
    /// (metadata and catalog discovery statements).
    pub fn forced(cluster: ClusterName) -> Self {
        Self { cluster, score: 0.0, factors: Factors::ZERO }
    }
}

/// Post-execution outcome reported back by a sibling service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionMetrics {
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub success: Option<bool>,
}

/// A decision as persisted in the history store, keyed by fingerprint.
///
/// The decision part is written once; the outcome suffix is updated in place
/// by `record_metrics` without touching the decision or the expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub fingerprint: String,
    pub cluster: ClusterName,
    pub score: f64,
    pub factors: Factors,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DecisionRecord {
    pub fn decision(&self) -> Decision {
        Decision { cluster: self.cluster, score: self.score, factors: self.factors }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Statement shape counts derived by pattern matching on the SQL text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ComplexityVector {
    pub joins: usize,
    pub aggregations: usize,
    pub subqueries: usize,
    pub partitioned_filters: usize,
    pub non_partitioned_filters: usize,
}
