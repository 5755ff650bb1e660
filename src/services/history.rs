//! Decision cache and execution history.
//!
//! The durable backend is an external key/value store that honors an
//! expiration attribute; `DecisionStore` is the seam it plugs into. The
//! in-process `MemoryDecisionStore` carries the same semantics (records are
//! kept past expiry and filtered on cached reads, the way TTL stores reap
//! lazily) and is what the gateway runs with by default.
//!
//! Store failures never propagate: a failed lookup is a cache miss, a failed
//! write logs and continues, and the historical factor degrades to neutral.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;

use crate::config::HistoryConfig;
use crate::models::{Decision, DecisionRecord, ExecutionMetrics};

const NEUTRAL_HISTORICAL_FACTOR: f64 = 0.5;

/// Fingerprints are logged by prefix; metrics callers may send short ones.
fn fp_prefix(fingerprint: &str) -> &str {
    fingerprint.get(..16).unwrap_or(fingerprint)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Fingerprint-keyed record storage. Implementations must return records
/// past their expiry; the caller decides which reads honor it.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<DecisionRecord>, StoreError>;

    async fn put(&self, record: DecisionRecord) -> Result<(), StoreError>;

    /// Merge outcome fields into an existing record, leaving the decision
    /// and expiry untouched. A missing record is not an error.
    async fn update_metrics(
        &self,
        fingerprint: &str,
        metrics: ExecutionMetrics,
    ) -> Result<(), StoreError>;
}

/// Process-local store over a concurrent map.
#[derive(Default)]
pub struct MemoryDecisionStore {
    records: DashMap<String, DecisionRecord>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<DecisionRecord>, StoreError> {
        Ok(self.records.get(fingerprint).map(|entry| entry.clone()))
    }

    async fn put(&self, record: DecisionRecord) -> Result<(), StoreError> {
        self.records.insert(record.fingerprint.clone(), record);
        Ok(())
    }

    async fn update_metrics(
        &self,
        fingerprint: &str,
        metrics: ExecutionMetrics,
    ) -> Result<(), StoreError> {
        if let Some(mut entry) = self.records.get_mut(fingerprint) {
            entry.execution_time = metrics.execution_time;
            entry.cost = metrics.cost;
            entry.success = metrics.success;
            entry.updated_at = Some(Utc::now());
        }
        Ok(())
    }
}

pub struct HistoryService {
    store: Arc<dyn DecisionStore>,
    ttl_hours: i64,
}

impl HistoryService {
    pub fn new(store: Arc<dyn DecisionStore>, config: &HistoryConfig) -> Self {
        tracing::info!(
            "history_service configured table={} region={} ttl_hours={}",
            config.table,
            config.region,
            config.ttl_hours
        );
        Self { store, ttl_hours: config.ttl_hours }
    }

    /// Cached decision for a fingerprint, honoring expiry.
    pub async fn lookup(&self, fingerprint: &str) -> Option<DecisionRecord> {
        match self.store.get(fingerprint).await {
            Ok(Some(record)) => {
                if record.is_expired(Utc::now()) {
                    tracing::debug!("cache_expired fingerprint={}", fp_prefix(fingerprint));
                    None
                } else {
                    tracing::debug!("cache_hit fingerprint={}", fp_prefix(fingerprint));
                    Some(record)
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::error!("get_cached_decision error={}", e);
                None
            },
        }
    }

    /// Persist a fresh decision with a new expiry window.
    pub async fn persist(&self, fingerprint: &str, decision: &Decision) {
        let now = Utc::now();
        let record = DecisionRecord {
            fingerprint: fingerprint.to_string(),
            cluster: decision.cluster,
            score: decision.score,
            factors: decision.factors,
            created_at: now,
            expires_at: now + Duration::hours(self.ttl_hours),
            execution_time: None,
            cost: None,
            success: None,
            updated_at: None,
        };

        match self.store.put(record).await {
            Ok(()) => tracing::debug!("decision_saved fingerprint={}", fp_prefix(fingerprint)),
            Err(e) => tracing::error!("save_decision error={}", e),
        }
    }

    /// Attach post-execution metrics to a stored decision.
    pub async fn record_metrics(&self, fingerprint: &str, metrics: ExecutionMetrics) {
        match self.store.update_metrics(fingerprint, metrics).await {
            Ok(()) => tracing::debug!("metrics_saved fingerprint={}", fp_prefix(fingerprint)),
            Err(e) => tracing::error!("save_metrics error={}", e),
        }
    }

    /// Historical factor in [0, 1] for the decision engine.
    ///
    /// A prior success endorses the prior score; a prior failure inverts it.
    /// Expiry is deliberately ignored here: stale history is still history.
    pub async fn historical_factor(&self, fingerprint: &str) -> f64 {
        match self.store.get(fingerprint).await {
            Ok(Some(record)) => {
                let success = record.success.unwrap_or(true);
                if success { record.score } else { 1.0 - record.score }
            },
            Ok(None) => NEUTRAL_HISTORICAL_FACTOR,
            Err(e) => {
                tracing::warn!("get_historical_factor error={}", e);
                NEUTRAL_HISTORICAL_FACTOR
            },
        }
    }
}
