pub mod api;
pub mod cluster;
pub mod decision;
pub mod probe;

pub use api::{MetricsRequest, RouteRequest, RouteResponse};
pub use cluster::ClusterName;
pub use decision::{ComplexityVector, Decision, DecisionRecord, ExecutionMetrics, Factors};
pub use probe::{ColumnFilter, ProbeOutcome, ProbeResult, ProbeSource, TableIo};
