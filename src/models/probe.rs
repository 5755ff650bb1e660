use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which explain strategy produced a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeSource {
    #[serde(rename = "io")]
    Io,
    #[serde(rename = "distributed_plan")]
    DistributedPlan,
}

/// One column-range constraint reported by the IO explain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ColumnFilter {
    pub column: String,
    #[serde(default)]
    pub low_value: Option<serde_json::Value>,
    #[serde(default)]
    pub low_bound: Option<String>,
    #[serde(default)]
    pub high_value: Option<serde_json::Value>,
    #[serde(default)]
    pub high_bound: Option<String>,
}

/// Per-table cost estimate extracted from an explain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableIo {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub estimated_size_bytes: f64,
    pub estimated_rows: f64,
    pub cpu_cost: f64,
    #[serde(default)]
    pub filters: Vec<ColumnFilter>,
}

/// Aggregated probe estimate for one statement.
///
/// Both explain strategies produce the same shape; `source` records which
/// one did. Tables are keyed by their fully qualified `catalog.schema.table`
/// name; a BTreeMap keeps archive output stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub tables: BTreeMap<String, TableIo>,
    pub total_size_bytes: f64,
    pub total_rows: f64,
    pub total_cpu_cost: f64,
    pub source: ProbeSource,
}

impl ProbeResult {
    pub fn empty(source: ProbeSource) -> Self {
        Self {
            tables: BTreeMap::new(),
            total_size_bytes: 0.0,
            total_rows: 0.0,
            total_cpu_cost: 0.0,
            source,
        }
    }

    pub fn total_size_gb(&self) -> f64 {
        self.total_size_bytes / (1024f64 * 1024.0 * 1024.0)
    }
}

/// Typed outcome of a probe invocation. Never surfaced to the client; the
/// decision engine treats everything but `Parsed` as an empty estimate.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Parsed(ProbeResult),
    /// The statement references a view or catalog the default backend cannot
    /// resolve; the distributed fallback would fail the same way.
    ViewError { message: String },
    /// The probe produced nothing usable (backend failure, no rows, parse
    /// failure). `reason` is for logs and the archive only.
    Empty { reason: String },
}

impl ProbeOutcome {
    pub fn result(&self) -> Option<&ProbeResult> {
        match self {
            ProbeOutcome::Parsed(result) => Some(result),
            _ => None,
        }
    }

    /// An outcome with no per-table estimates, which makes the volume factor
    /// fall back to neutral.
    pub fn is_empty(&self) -> bool {
        match self {
            ProbeOutcome::Parsed(result) => result.tables.is_empty(),
            _ => true,
        }
    }
}
