//! Routing orchestration: fingerprint → cache → analysis → decision.
//!
//! Shared by the statement submission path and the `/api/v1/route` sidecar
//! endpoint. Never fails: every collaborator on this path degrades to a
//! weaker decision instead of an error.

use std::sync::Arc;

use crate::models::{ClusterName, Decision, Factors};
use crate::services::analyzer::QueryAnalyzer;
use crate::services::decision::DecisionEngine;
use crate::services::fingerprint::fingerprint;
use crate::services::history::HistoryService;
use crate::services::probe::IoProbe;

/// A routing decision plus how it was reached.
#[derive(Debug, Clone)]
pub struct RouteDecision {
    pub fingerprint: String,
    pub cluster: ClusterName,
    pub score: f64,
    pub factors: Factors,
    pub cached: bool,
}

pub struct RoutingService {
    history: Arc<HistoryService>,
    probe: Arc<IoProbe>,
    engine: DecisionEngine,
}

impl RoutingService {
    pub fn new(history: Arc<HistoryService>, probe: Arc<IoProbe>, engine: DecisionEngine) -> Self {
        Self { history, probe, engine }
    }

    /// Decide the target cluster for one statement.
    pub async fn route(&self, query: &str) -> RouteDecision {
        let fp = fingerprint(query);
        tracing::debug!("route_request fingerprint={}", &fp[..16]);

        if let Some(record) = self.history.lookup(&fp).await {
            tracing::info!(
                "route_response cached=true fingerprint={} cluster={}",
                &fp[..16],
                record.cluster
            );
            return RouteDecision {
                fingerprint: fp,
                cluster: record.cluster,
                score: record.score,
                factors: record.factors,
                cached: true,
            };
        }

        // Metadata and catalog discovery statements go straight to the small
        // cluster; probing them is wasted work.
        if QueryAnalyzer::is_metadata_statement(query) {
            tracing::info!(
                "route_response metadata=true cluster={} fingerprint={}",
                ClusterName::Ecs,
                &fp[..16]
            );
            let decision = Decision::forced(ClusterName::Ecs);
            self.history.persist(&fp, &decision).await;
            return RouteDecision {
                fingerprint: fp,
                cluster: decision.cluster,
                score: decision.score,
                factors: decision.factors,
                cached: false,
            };
        }

        tracing::info!("route_analysis phase=explain_io");
        let probe_outcome = self.probe.probe(query).await;
        let complexity = QueryAnalyzer::complexity(query);
        let historical = self.history.historical_factor(&fp).await;

        let decision = self.engine.decide(&probe_outcome, &complexity, historical);
        tracing::info!(
            "route_response cluster={} score={:.3} fingerprint={}",
            decision.cluster,
            decision.score,
            &fp[..16]
        );
        self.history.persist(&fp, &decision).await;

        RouteDecision {
            fingerprint: fp,
            cluster: decision.cluster,
            score: decision.score,
            factors: decision.factors,
            cached: false,
        }
    }
}
