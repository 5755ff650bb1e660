//! Query-id to cluster routing table.
//!
//! Installed when a submission response is parsed, consulted on every
//! follow-up whose path carries a query id. Entries are written once per id
//! (rewrites are idempotent) and live for the process lifetime; the map is
//! not bounded. Backed by a DashMap so follow-up reads never block writers.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ClusterName;

// Backend query ids look like 20240131_104500_00042_abcde and appear in
// follow-up paths between slashes.
static QUERY_ID_IN_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/(\d{8}_\d{6}_\d{5}_[^/]+)/").unwrap());

#[derive(Default)]
pub struct QueryTracker {
    map: DashMap<String, ClusterName>,
}

impl QueryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, query_id: &str, cluster: ClusterName) {
        self.map.insert(query_id.to_string(), cluster);
        tracing::debug!("query_mapped query_id={} cluster={}", query_id, cluster);
    }

    pub fn get(&self, query_id: &str) -> Option<ClusterName> {
        self.map.get(query_id).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Resolve the cluster for a follow-up path, falling back to the default
    /// cluster when the path carries no known query id.
    pub fn cluster_for_path(&self, path: &str) -> ClusterName {
        if let Some(caps) = QUERY_ID_IN_PATH.captures(path) {
            let query_id = &caps[1];
            match self.get(query_id) {
                Some(cluster) => {
                    tracing::debug!(
                        "path_cluster_resolved cluster={} query_id={}",
                        cluster,
                        query_id
                    );
                    return cluster;
                },
                None => {
                    tracing::debug!(
                        "path_cluster_unknown query_id={} fallback={}",
                        query_id,
                        ClusterName::FALLBACK
                    );
                },
            }
        }
        ClusterName::FALLBACK
    }
}
