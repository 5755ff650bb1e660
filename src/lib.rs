//! DyraSQL Library
//!
//! This library contains all the core modules for the DyraSQL routing
//! gateway: statement analysis, cost probing, decision making, and the
//! proxying HTTP surface.

use std::sync::Arc;

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use services::{
    DecisionEngine, ExplainArchiver, GatewayClients, HistoryService, IoProbe, QueryAnalyzer,
    QueryTracker, RoutingService, UrlRewriter,
};

/// Application shared state
///
/// Design Philosophy: Keep it simple - Rust's type system IS our DI container.
/// All services are wrapped in Arc for cheap cloning and thread safety.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub routing_service: Arc<RoutingService>,
    pub history_service: Arc<HistoryService>,
    pub query_tracker: Arc<QueryTracker>,
    pub url_rewriter: Arc<UrlRewriter>,
    pub clients: Arc<GatewayClients>,
}

#[cfg(test)]
mod tests;
