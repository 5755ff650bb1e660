//! Parser for textual `EXPLAIN (TYPE DISTRIBUTED)` plans.
//!
//! Used when the IO explain yields no table information (typically views).
//! Table references are pulled out of scan nodes; cost hints are summed and
//! spread uniformly across the tables found, which is a rough but usable
//! volume estimate.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::models::{ProbeResult, ProbeSource, TableIo};

static TABLE_SCAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)TableScan\[table\s*=\s*([^\],]+)").unwrap());

static SCAN_PROJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ScanProject\[table\s*=\s*([^\],]+)").unwrap());

static TABLE_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)table:([a-zA-Z_]\w*\.[a-zA-Z_]\w*\.[a-zA-Z_]\w*)").unwrap());

// Cost hints look like: est. 1150371 rows, 3.08GB
static COST_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"est\.\s*([\d.]+)\s*rows?,\s*([\d.]+)\s*(\w+)").unwrap());

static INNER_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn size_to_bytes(size: f64, unit: &str) -> f64 {
    match unit.to_lowercase().as_str() {
        "b" => size,
        "kb" => size * 1024.0,
        "mb" => size * 1024.0 * 1024.0,
        "gb" => size * 1024.0 * 1024.0 * 1024.0,
        "tb" => size * 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => size,
    }
}

/// Extract table references and cost hints from a distributed plan text.
pub fn parse_distributed_plan(plan_text: &str) -> ProbeResult {
    let mut tables: BTreeMap<String, TableIo> = BTreeMap::new();
    let mut total_size_bytes = 0.0;
    let mut total_rows = 0.0;

    for pattern in [&*TABLE_SCAN, &*SCAN_PROJECT, &*TABLE_COLON] {
        for caps in pattern.captures_iter(plan_text) {
            let reference = INNER_WHITESPACE.replace_all(caps[1].trim(), "").into_owned();
            if reference.is_empty() || tables.contains_key(&reference) {
                continue;
            }

            let parts: Vec<&str> = reference.split('.').collect();
            let (catalog, schema, table) = match parts.as_slice() {
                [catalog, schema, rest @ ..] if !rest.is_empty() => {
                    (catalog.to_string(), schema.to_string(), rest.join("."))
                },
                [schema, table] => ("iceberg".to_string(), schema.to_string(), table.to_string()),
                _ => continue,
            };

            let full_name = format!("{}.{}.{}", catalog, schema, table);
            tracing::debug!("explain_distributed table_found table={}", full_name);
            tables.insert(
                full_name,
                TableIo {
                    catalog,
                    schema,
                    table,
                    estimated_size_bytes: 0.0,
                    estimated_rows: 0.0,
                    cpu_cost: 0.0,
                    filters: Vec::new(),
                },
            );
        }
    }

    if !tables.is_empty() {
        for caps in COST_HINT.captures_iter(plan_text) {
            if let (Ok(rows), Ok(size)) = (caps[1].parse::<f64>(), caps[2].parse::<f64>()) {
                total_rows += rows;
                total_size_bytes += size_to_bytes(size, &caps[3]);
            }
        }
    }

    // The plan does not attribute costs to tables, so spread totals evenly
    if !tables.is_empty() && total_size_bytes > 0.0 {
        let per_table_size = total_size_bytes / tables.len() as f64;
        let per_table_rows = total_rows / tables.len() as f64;
        for io in tables.values_mut() {
            io.estimated_size_bytes = per_table_size;
            io.estimated_rows = per_table_rows;
        }
    }

    ProbeResult {
        tables,
        total_size_bytes,
        total_rows,
        total_cpu_cost: 0.0,
        source: ProbeSource::DistributedPlan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PLAN: &str = "\
Fragment 1 [SOURCE]
    Output layout: [orderkey]
    ScanProject[table = iceberg.sales.orders, filterPredicate = true]
        Layout: [orderkey:bigint]
        Estimates: {rows: 1000000 (8.58MB)}
        est. 1000000 rows, 2.5 GB
    TableScan[table = iceberg.sales.customers]
        est. 500000 rows, 512 MB
";

    #[test]
    fn test_extracts_scan_nodes() {
        let result = parse_distributed_plan(SAMPLE_PLAN);
        assert_eq!(result.source, ProbeSource::DistributedPlan);
        assert_eq!(result.tables.len(), 2);
        assert!(result.tables.contains_key("iceberg.sales.orders"));
        assert!(result.tables.contains_key("iceberg.sales.customers"));
    }

    #[test]
    fn test_cost_hints_summed_and_distributed() {
        let result = parse_distributed_plan(SAMPLE_PLAN);
        let expected_bytes = 2.5 * 1024f64.powi(3) + 512.0 * 1024f64.powi(2);
        assert!((result.total_size_bytes - expected_bytes).abs() < 1.0);
        assert_eq!(result.total_rows, 1_500_000.0);

        let orders = &result.tables["iceberg.sales.orders"];
        assert!((orders.estimated_size_bytes - expected_bytes / 2.0).abs() < 1.0);
        assert_eq!(orders.estimated_rows, 750_000.0);
    }

    #[test]
    fn test_two_part_reference_gets_default_catalog() {
        let result = parse_distributed_plan("TableScan[table = sales.orders]");
        assert!(result.tables.contains_key("iceberg.sales.orders"));
    }

    #[test]
    fn test_table_colon_format() {
        let result = parse_distributed_plan("source fragment table:hive.logs.events:partitioned");
        assert!(result.tables.contains_key("hive.logs.events"));
    }

    #[test]
    fn test_no_tables_no_estimates() {
        let result = parse_distributed_plan("Output[columnNames = [x]]\nest. 10 rows, 1 KB");
        assert!(result.tables.is_empty());
        assert_eq!(result.total_size_bytes, 0.0);
    }
}
