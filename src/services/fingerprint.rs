//! Literal-independent statement identity.
//!
//! Two statements that differ only in formatting, case, string literals or
//! integer literals hash to the same fingerprint, which keys the decision
//! cache and the execution history.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static STRING_LITERALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^']*'").unwrap());

static DIGIT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Fingerprint a SQL statement as 64 lowercase hex characters.
///
/// Normalization order is fixed: case fold, whitespace-run collapse, string
/// literal masking, digit masking. Digits are masked last so digits inside
/// string literals never leak into the hash.
pub fn fingerprint(sql: &str) -> String {
    let normalized = sql.trim().to_lowercase();
    let normalized = WHITESPACE_RUNS.replace_all(&normalized, " ");
    let normalized = STRING_LITERALS.replace_all(&normalized, "'?'");
    let normalized = DIGIT_RUNS.replace_all(&normalized, "?");

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_and_case_insensitive() {
        let a = fingerprint("SELECT *  FROM  sales.orders");
        let b = fingerprint("select *\nfrom sales.orders");
        assert_eq!(a, b);
    }

    #[test]
    fn test_integer_literals_masked() {
        let a = fingerprint("SELECT * FROM t WHERE id = 42");
        let b = fingerprint("SELECT * FROM t WHERE id = 99999");
        assert_eq!(a, b);
    }

    #[test]
    fn test_string_literals_masked() {
        let a = fingerprint("SELECT * FROM t WHERE region = 'us-east'");
        let b = fingerprint("SELECT * FROM t WHERE region = 'eu-west'");
        assert_eq!(a, b);
    }

    #[test]
    fn test_digits_inside_literals_do_not_leak() {
        // If digits were masked first, '2024-01-01' would become '?'-?'-?'
        // and the two statements would hash differently.
        let a = fingerprint("SELECT * FROM t WHERE d = '2024-01-01'");
        let b = fingerprint("SELECT * FROM t WHERE d = 'anything'");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_statements_differ() {
        let a = fingerprint("SELECT * FROM sales.orders");
        let b = fingerprint("SELECT * FROM sales.customers");
        assert_ne!(a, b);
    }

    #[test]
    fn test_hex64_shape() {
        let fp = fingerprint("SELECT 1");
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
