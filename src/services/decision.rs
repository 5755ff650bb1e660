//! Routing score computation and cluster selection.
//!
//! `score = w1·volume + w2·complexity + w3·historical`, each factor in
//! [0, 1], thresholded into one of the three clusters.

use crate::config::DecisionConfig;
use crate::models::{ClusterName, ComplexityVector, Decision, Factors, ProbeOutcome};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

// Volume normalization constants
const AVG_FILE_SIZE_MB: f64 = 50.0;
const MAX_FILES: f64 = 10_000.0;
const MAX_SIZE_GB: f64 = 1_000.0;
const OPTIMIZATION_FACTOR: f64 = 0.1;
const MIN_SIZE_GB: f64 = 0.001;

// Complexity weights
const JOIN_WEIGHT: f64 = 0.2;
const AGGREGATION_WEIGHT: f64 = 0.15;
const SUBQUERY_WEIGHT: f64 = 0.25;
const PARTITIONED_FILTER_WEIGHT: f64 = 0.02;
const NON_PARTITIONED_FILTER_WEIGHT: f64 = 0.1;
const COMPLEXITY_LIMIT: f64 = 2.0;

const NEUTRAL_VOLUME_FACTOR: f64 = 0.5;

fn clip01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

pub struct DecisionEngine {
    weight_volume: f64,
    weight_complexity: f64,
    weight_historical: f64,
    ecs_threshold: f64,
    emr_standard_threshold: f64,
}

impl DecisionEngine {
    pub fn new(config: &DecisionConfig) -> Self {
        tracing::info!(
            "decision_engine configured w1={:.2} w2={:.2} w3={:.2} ecs_threshold={:.2} emr_standard_threshold={:.2}",
            config.weight_volume,
            config.weight_complexity,
            config.weight_historical,
            config.ecs_threshold,
            config.emr_standard_threshold
        );

        Self {
            weight_volume: config.weight_volume,
            weight_complexity: config.weight_complexity,
            weight_historical: config.weight_historical,
            ecs_threshold: config.ecs_threshold,
            emr_standard_threshold: config.emr_standard_threshold,
        }
    }

    pub fn decide(
        &self,
        probe: &ProbeOutcome,
        complexity: &ComplexityVector,
        historical: f64,
    ) -> Decision {
        let volume = Self::volume_factor(probe);
        let complexity = Self::complexity_factor(complexity);

        let score = self.weight_volume * volume
            + self.weight_complexity * complexity
            + self.weight_historical * historical;
        let cluster = self.select_cluster(score);

        tracing::info!(
            "decision cluster={} score={:.3} volume={:.2} complexity={:.2} historical={:.2}",
            cluster,
            score,
            volume,
            complexity,
            historical
        );

        Decision { cluster, score, factors: Factors { volume, complexity, historical } }
    }

    /// Volume factor from probe totals.
    ///
    /// File count is estimated from total bytes at a fixed 50 MiB average
    /// file size; both the file count and size axes are log-normalized
    /// against their limits and blended 30/70.
    fn volume_factor(probe: &ProbeOutcome) -> f64 {
        let Some(result) = probe.result() else {
            return NEUTRAL_VOLUME_FACTOR;
        };
        if result.tables.is_empty() {
            return NEUTRAL_VOLUME_FACTOR;
        }

        let total_size_gb = result.total_size_bytes / GIB;
        let estimated_files = ((total_size_gb * 1024.0) / AVG_FILE_SIZE_MB).floor().max(1.0);
        let effective_size_gb = total_size_gb.max(MIN_SIZE_GB);

        let normalized_files = (estimated_files.ln() / MAX_FILES.ln()).min(1.0);
        let normalized_size = (effective_size_gb.ln() / MAX_SIZE_GB.ln()).min(1.0);

        let fv = (normalized_files * 0.3 + normalized_size * 0.7) * (1.0 - OPTIMIZATION_FACTOR);

        tracing::debug!(
            "volume_factor files={} size_gb={:.2} fv={:.3}",
            estimated_files,
            total_size_gb,
            fv
        );
        clip01(fv)
    }

    fn complexity_factor(complexity: &ComplexityVector) -> f64 {
        let fc = (complexity.joins as f64 * JOIN_WEIGHT
            + complexity.aggregations as f64 * AGGREGATION_WEIGHT
            + complexity.subqueries as f64 * SUBQUERY_WEIGHT
            + complexity.partitioned_filters as f64 * PARTITIONED_FILTER_WEIGHT
            + complexity.non_partitioned_filters as f64 * NON_PARTITIONED_FILTER_WEIGHT)
            / COMPLEXITY_LIMIT;

        tracing::debug!(
            "complexity_factor joins={} aggs={} fc={:.3}",
            complexity.joins,
            complexity.aggregations,
            fc
        );
        clip01(fc)
    }

    fn select_cluster(&self, score: f64) -> ClusterName {
        if score < self.ecs_threshold {
            ClusterName::Ecs
        } else if score <= self.emr_standard_threshold {
            ClusterName::EmrStandard
        } else {
            ClusterName::EmrOptimized
        }
    }
}
