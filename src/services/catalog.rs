//! Catalog qualification for probe statements.
//!
//! The default backend resolves unqualified `schema.table` references against
//! its session catalog, which the gateway does not control. Probe statements
//! therefore get the canonical catalog prefixed onto two-part references.
//! Only the probe sees the rewritten text; the client's statement is
//! forwarded verbatim.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const CANONICAL_CATALOG: &str = "iceberg";

/// First identifiers that are already catalogs and must not be prefixed.
const KNOWN_CATALOGS: [&str; 6] = ["iceberg", "hive", "mysql", "postgresql", "mongodb", "system"];

// Quoted form: FROM/JOIN "schema"."table"
static QUOTED_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(from|(?:left|right|full|inner|cross)?\s*(?:outer\s+)?join)\s+("\w+")\.("\w+")"#)
        .unwrap()
});

// Unquoted form: FROM/JOIN schema.table
static UNQUOTED_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(from|(?:left|right|full|inner|cross)?\s*(?:outer\s+)?join)\s+([a-zA-Z_][a-zA-Z0-9_]*)\.([a-zA-Z_][a-zA-Z0-9_]*)",
    )
    .unwrap()
});

/// Prefix the canonical catalog onto two-part table references after FROM and
/// JOIN keywords. Three-part references and known catalogs are left alone.
/// Idempotent.
pub fn normalize_catalog(sql: &str) -> String {
    let pass1 = QUOTED_REFERENCE
        .replace_all(sql, |caps: &Captures| {
            // A third quoted part means the reference is already qualified
            if followed_by_dot(sql, caps) {
                return caps[0].to_string();
            }
            tracing::debug!(
                "normalize_quoted keyword={} schema={} table={}",
                caps[1].trim(),
                &caps[2],
                &caps[3]
            );
            format!("{} {}.{}.{}", &caps[1], CANONICAL_CATALOG, &caps[2], &caps[3])
        })
        .into_owned();

    UNQUOTED_REFERENCE
        .replace_all(&pass1, |caps: &Captures| {
            if followed_by_dot(&pass1, caps) {
                return caps[0].to_string();
            }
            let schema = &caps[2];
            if KNOWN_CATALOGS.contains(&schema.to_lowercase().as_str()) {
                return caps[0].to_string();
            }
            tracing::debug!(
                "normalize_unquoted keyword={} schema={} table={}",
                caps[1].trim(),
                schema,
                &caps[3]
            );
            format!("{} {}.{}.{}", &caps[1], CANONICAL_CATALOG, schema, &caps[3])
        })
        .into_owned()
}

fn followed_by_dot(haystack: &str, caps: &Captures) -> bool {
    let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
    haystack[end..].starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquoted_two_part_gets_catalog() {
        assert_eq!(
            normalize_catalog("select * from sales.orders"),
            "select * from iceberg.sales.orders"
        );
    }

    #[test]
    fn test_quoted_two_part_gets_catalog() {
        assert_eq!(
            normalize_catalog(r#"select * from "sales"."orders""#),
            r#"select * from iceberg."sales"."orders""#
        );
    }

    #[test]
    fn test_three_part_left_alone() {
        let sql = "select * from analytics.sales.orders";
        assert_eq!(normalize_catalog(sql), sql);

        let quoted = r#"select * from "analytics"."sales"."orders""#;
        assert_eq!(normalize_catalog(quoted), quoted);
    }

    #[test]
    fn test_known_catalogs_left_alone() {
        for catalog in ["iceberg", "hive", "mysql", "postgresql", "mongodb", "system"] {
            let sql = format!("select * from {}.t1", catalog);
            assert_eq!(normalize_catalog(&sql), sql);
        }
    }

    #[test]
    fn test_join_variants_rewritten() {
        let sql = "select * from a.t1 \
                   join b.t2 on t1.id = t2.id \
                   left outer join c.t3 on t2.id = t3.id";
        let out = normalize_catalog(sql);
        assert!(out.contains("from iceberg.a.t1"));
        assert!(out.contains("join iceberg.b.t2"));
        assert!(out.contains("left outer join iceberg.c.t3"));
    }

    #[test]
    fn test_newline_between_keyword_and_table() {
        let out = normalize_catalog("select *\nfrom\n  sales.orders");
        assert!(out.contains("iceberg.sales.orders"));
    }

    #[test]
    fn test_single_identifier_untouched() {
        let sql = "select * from orders";
        assert_eq!(normalize_catalog(sql), sql);
    }

    #[test]
    fn test_idempotent() {
        let once = normalize_catalog("select * from sales.orders join other.t on 1 = 1");
        let twice = normalize_catalog(&once);
        assert_eq!(once, twice);
    }
}
