pub mod analyzer;
pub mod archiver;
pub mod catalog;
pub mod clients;
pub mod decision;
pub mod fingerprint;
pub mod history;
pub mod probe;
pub mod rewriter;
pub mod routing;
pub mod tracker;

pub use analyzer::QueryAnalyzer;
pub use archiver::{ArchiveRecord, ExplainArchiver};
pub use catalog::normalize_catalog;
pub use clients::GatewayClients;
pub use decision::DecisionEngine;
pub use fingerprint::fingerprint;
pub use history::{DecisionStore, HistoryService, MemoryDecisionStore, StoreError};
pub use probe::{IoProbe, ProbeError};
pub use rewriter::UrlRewriter;
pub use routing::{RouteDecision, RoutingService};
pub use tracker::QueryTracker;
