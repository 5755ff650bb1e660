//! Syntactic statement classification: keep-alive detection, metadata and
//! catalog-discovery detection, and complexity counting.
//!
//! Everything here is regex pattern matching over the statement text; nothing
//! talks to a backend.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ComplexityVector;

static JOINS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bjoin\b").unwrap());

static AGGREGATIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(count|sum|avg|min|max|group_concat)\s*\(").unwrap());

static SUBQUERIES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(select\s").unwrap());

// Any WHERE mentioning a date-like token counts as a partitioned filter,
// even when the token is not a partition column.
static PARTITIONED_FILTERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"where.*(date|data|timestamp|year|month|day)").unwrap());

static WHERE_CLAUSES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bwhere\b").unwrap());

const METADATA_PREFIXES: [&str; 5] =
    ["SHOW ", "DESCRIBE ", "DESC ", "SELECT VERSION()", "SELECT CURRENT_"];

const KEEPALIVE_STATEMENTS: [&str; 3] = ["SELECT 1", "SELECT 1 AS KEEPALIVE", "SELECT 1 AS 1"];

const KEEPALIVE_PREFIXES: [&str; 2] = ["SELECT 'KEEP ALIVE'", "SELECT 'KEEPALIVE'"];

pub struct QueryAnalyzer;

impl QueryAnalyzer {
    /// Uppercased, semicolon-stripped form used for prefix dispatch.
    fn normalize_for_dispatch(sql: &str) -> String {
        sql.trim().to_uppercase().trim_end_matches(';').trim().to_string()
    }

    /// Liveness statements sent by JDBC drivers and BI tools. Routed to the
    /// fallback cluster without touching the decision machinery.
    pub fn is_keepalive(sql: &str) -> bool {
        let normalized = Self::normalize_for_dispatch(sql);
        KEEPALIVE_STATEMENTS.contains(&normalized.as_str())
            || KEEPALIVE_PREFIXES.iter().any(|prefix| normalized.starts_with(prefix))
    }

    /// Catalog discovery traffic from IDEs and JDBC metadata calls.
    pub fn is_catalog_statement(sql: &str) -> bool {
        if sql.trim().is_empty() {
            return false;
        }
        let lowered = sql.trim().to_lowercase();
        lowered.contains("system.jdbc") || lowered.contains("information_schema")
    }

    /// Metadata and catalog statements are forced to the small cluster
    /// without probing.
    pub fn is_metadata_statement(sql: &str) -> bool {
        let normalized = Self::normalize_for_dispatch(sql);
        METADATA_PREFIXES.iter().any(|prefix| normalized.starts_with(prefix))
            || Self::is_catalog_statement(sql)
    }

    /// Count the syntactic features that feed the complexity factor.
    pub fn complexity(sql: &str) -> ComplexityVector {
        let lowered = sql.to_lowercase();

        let joins = JOINS.find_iter(&lowered).count();
        let aggregations = AGGREGATIONS.find_iter(&lowered).count();
        let subqueries = SUBQUERIES.find_iter(&lowered).count();
        let partitioned_filters = PARTITIONED_FILTERS.find_iter(&lowered).count();
        let where_clauses = WHERE_CLAUSES.find_iter(&lowered).count();
        let non_partitioned_filters = where_clauses.saturating_sub(partitioned_filters);

        let complexity = ComplexityVector {
            joins,
            aggregations,
            subqueries,
            partitioned_filters,
            non_partitioned_filters,
        };
        tracing::debug!("analyze_complexity {:?}", complexity);
        complexity
    }
}
