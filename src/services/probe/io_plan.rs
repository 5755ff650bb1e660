//! Parser for `EXPLAIN (TYPE IO)` JSON payloads.
//!
//! The payload is a single JSON document with one `inputTableColumnInfos`
//! entry per scanned table, each carrying a cost estimate and the column
//! range constraints the planner could push down.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::models::{ColumnFilter, ProbeResult, ProbeSource, TableIo};

/// Estimates can come back as JSON numbers, the string "NaN", or be missing.
fn safe_float(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn parse_filters(constraint: Option<&Value>) -> Vec<ColumnFilter> {
    let mut filters = Vec::new();
    let Some(column_constraints) =
        constraint.and_then(|c| c.get("columnConstraints")).and_then(Value::as_array)
    else {
        return filters;
    };

    for constraint in column_constraints {
        let column = string_field(constraint, "columnName");
        let ranges = constraint
            .get("domain")
            .and_then(|d| d.get("ranges"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for range in &ranges {
            let low = range.get("low");
            let high = range.get("high");
            filters.push(ColumnFilter {
                column: column.clone(),
                low_value: low.and_then(|l| l.get("value")).cloned(),
                low_bound: low
                    .and_then(|l| l.get("bound"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                high_value: high.and_then(|h| h.get("value")).cloned(),
                high_bound: high
                    .and_then(|h| h.get("bound"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }
    }
    filters
}

/// Extract per-table estimates and totals from a parsed IO explain document.
pub fn parse_io_plan(explain: &Value) -> ProbeResult {
    let mut tables: BTreeMap<String, TableIo> = BTreeMap::new();
    let mut total_size_bytes = 0.0;
    let mut total_rows = 0.0;
    let mut total_cpu_cost = 0.0;

    let input_tables =
        explain.get("inputTableColumnInfos").and_then(Value::as_array).cloned().unwrap_or_default();

    for info in &input_tables {
        let table_obj = info.get("table").cloned().unwrap_or(Value::Null);
        let schema_table = table_obj.get("schemaTable").cloned().unwrap_or(Value::Null);

        // Nested form first, flat fallback for older payload shapes
        let mut catalog = string_field(&table_obj, "catalog");
        let mut schema = string_field(&schema_table, "schema");
        let mut table = string_field(&schema_table, "table");
        if catalog.is_empty() {
            catalog = string_field(info, "catalog");
        }
        if schema.is_empty() {
            schema = string_field(info, "schema");
        }
        if table.is_empty() {
            table = string_field(info, "table");
        }

        if catalog.is_empty() || schema.is_empty() || table.is_empty() {
            continue;
        }

        let full_name = format!("{}.{}.{}", catalog, schema, table);
        let estimate = info.get("estimate");
        let estimated_size_bytes = safe_float(estimate.and_then(|e| e.get("outputSizeInBytes")));
        let estimated_rows = safe_float(estimate.and_then(|e| e.get("outputRowCount")));
        let cpu_cost = safe_float(estimate.and_then(|e| e.get("cpuCost")));
        let filters = parse_filters(info.get("constraint"));

        tracing::debug!(
            "explain_table table={} size_bytes={} rows={} filters={}",
            full_name,
            estimated_size_bytes,
            estimated_rows,
            filters.len()
        );

        total_size_bytes += estimated_size_bytes;
        total_rows += estimated_rows;
        total_cpu_cost += cpu_cost;

        tables.insert(
            full_name,
            TableIo {
                catalog,
                schema,
                table,
                estimated_size_bytes,
                estimated_rows,
                cpu_cost,
                filters,
            },
        );
    }

    ProbeResult { tables, total_size_bytes, total_rows, total_cpu_cost, source: ProbeSource::Io }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "inputTableColumnInfos": [
                {
                    "table": {
                        "catalog": "iceberg",
                        "schemaTable": {"schema": "sales", "table": "orders"}
                    },
                    "constraint": {
                        "none": false,
                        "columnConstraints": [{
                            "columnName": "date",
                            "type": "timestamp(6)",
                            "domain": {
                                "ranges": [{
                                    "low": {"value": "2024-01-01", "bound": "EXACTLY"},
                                    "high": {"bound": "ABOVE"}
                                }]
                            }
                        }]
                    },
                    "estimate": {
                        "outputRowCount": 1150371.0,
                        "outputSizeInBytes": 3.305564045e9,
                        "cpuCost": 3.305564045e9
                    }
                },
                {
                    "table": {
                        "catalog": "iceberg",
                        "schemaTable": {"schema": "sales", "table": "customers"}
                    },
                    "estimate": {
                        "outputRowCount": "NaN",
                        "outputSizeInBytes": 1024.0,
                        "cpuCost": null
                    }
                }
            ],
            "estimate": {"outputRowCount": 1150371.0}
        })
    }

    #[test]
    fn test_parses_tables_and_totals() {
        let result = parse_io_plan(&sample_payload());
        assert_eq!(result.tables.len(), 2);
        assert_eq!(result.source, ProbeSource::Io);

        let orders = &result.tables["iceberg.sales.orders"];
        assert_eq!(orders.estimated_rows, 1150371.0);
        assert_eq!(orders.estimated_size_bytes, 3.305564045e9);
        assert_eq!(orders.filters.len(), 1);
        assert_eq!(orders.filters[0].column, "date");
        assert_eq!(orders.filters[0].low_bound.as_deref(), Some("EXACTLY"));

        assert_eq!(result.total_size_bytes, 3.305564045e9 + 1024.0);
        assert_eq!(result.total_rows, 1150371.0);
    }

    #[test]
    fn test_nan_and_null_estimates_become_zero() {
        let result = parse_io_plan(&sample_payload());
        let customers = &result.tables["iceberg.sales.customers"];
        assert_eq!(customers.estimated_rows, 0.0);
        assert_eq!(customers.cpu_cost, 0.0);
        assert_eq!(customers.estimated_size_bytes, 1024.0);
    }

    #[test]
    fn test_incomplete_table_reference_skipped() {
        let payload = json!({
            "inputTableColumnInfos": [
                {"table": {"schemaTable": {"schema": "s", "table": "t"}}, "estimate": {}}
            ]
        });
        let result = parse_io_plan(&payload);
        assert!(result.tables.is_empty());
    }

    #[test]
    fn test_empty_payload() {
        let result = parse_io_plan(&json!({}));
        assert!(result.tables.is_empty());
        assert_eq!(result.total_size_bytes, 0.0);
    }
}
