//! Persists every probe outcome as a JSON document for offline analysis.
//!
//! One file per probe invocation, named with a microsecond timestamp plus a
//! fingerprint prefix so concurrent writers never collide. Archiving is
//! strictly best-effort: a failed write logs and the probe carries on.

use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;

use crate::config::ExplainsConfig;
use crate::models::ProbeResult;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Everything worth keeping about one probe invocation.
pub struct ArchiveRecord<'a> {
    pub fingerprint: &'a str,
    pub query: &'a str,
    pub normalized_query: &'a str,
    pub explain_query: &'a str,
    pub explain_type: &'a str,
    pub raw: serde_json::Value,
    pub parsed: Option<&'a ProbeResult>,
    pub error: Option<String>,
    pub note: Option<String>,
}

pub struct ExplainArchiver {
    enabled: bool,
    dir: PathBuf,
}

impl ExplainArchiver {
    pub fn new(config: &ExplainsConfig) -> Self {
        let dir = PathBuf::from(&config.dir);
        if config.enabled
            && let Err(e) = std::fs::create_dir_all(&dir)
        {
            tracing::warn!("explains_dir_create_failed dir={} error={}", dir.display(), e);
        }
        Self { enabled: config.enabled, dir }
    }

    pub fn record(&self, record: ArchiveRecord<'_>) {
        if !self.enabled {
            return;
        }

        let now = Utc::now();
        let filename =
            format!("{}_{}.json", now.format("%Y%m%d_%H%M%S_%6f"), &record.fingerprint[..16]);
        let path = self.dir.join(filename);

        let summary = match record.parsed {
            Some(parsed) => json!({
                "total_tables": parsed.tables.len(),
                "total_size_bytes": parsed.total_size_bytes,
                "total_size_gb": parsed.total_size_bytes / GIB,
                "total_rows": parsed.total_rows,
                "total_cpu_cost": parsed.total_cpu_cost,
            }),
            None => json!({
                "total_tables": 0,
                "total_size_bytes": 0.0,
                "total_size_gb": 0.0,
                "total_rows": 0.0,
                "total_cpu_cost": 0.0,
            }),
        };

        let document = json!({
            "timestamp": now.to_rfc3339(),
            "fingerprint": record.fingerprint,
            "query": record.query,
            "normalized_query": record.normalized_query,
            "explain_query": record.explain_query,
            "explain_type": record.explain_type,
            "raw_explain": record.raw,
            "error": record.error,
            "note": record.note,
            "parsed_result": record.parsed,
            "summary": summary,
        });

        match serde_json::to_vec_pretty(&document) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&path, bytes) {
                    tracing::warn!("explain_save_failed path={} error={}", path.display(), e);
                } else {
                    tracing::info!(
                        "explain_saved path={} type={} error={}",
                        path.display(),
                        record.explain_type,
                        record.error.as_deref().unwrap_or("none")
                    );
                }
            },
            Err(e) => tracing::warn!("explain_serialize_failed error={}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fingerprint::fingerprint;

    fn temp_archiver(enabled: bool) -> (ExplainArchiver, PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "dyrasql-explains-{}-{}",
            std::process::id(),
            Utc::now().format("%H%M%S%6f")
        ));
        let config = ExplainsConfig { enabled, dir: dir.to_string_lossy().into_owned() };
        (ExplainArchiver::new(&config), dir)
    }

    #[test]
    fn test_record_writes_one_file() {
        let (archiver, dir) = temp_archiver(true);
        let fp = fingerprint("SELECT * FROM sales.orders");

        archiver.record(ArchiveRecord {
            fingerprint: &fp,
            query: "SELECT * FROM sales.orders",
            normalized_query: "SELECT * FROM iceberg.sales.orders",
            explain_query: "EXPLAIN (TYPE IO) SELECT * FROM iceberg.sales.orders",
            explain_type: "IO",
            raw: json!({"inputTableColumnInfos": []}),
            parsed: None,
            error: Some("No data returned".to_string()),
            note: None,
        });

        let entries: Vec<_> = std::fs::read_dir(&dir).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name().into_string().unwrap();
        assert!(name.ends_with(&format!("{}.json", &fp[..16])));

        let content = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["explain_type"], "IO");
        assert_eq!(parsed["error"], "No data returned");
        assert_eq!(parsed["summary"]["total_tables"], 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_disabled_archiver_writes_nothing() {
        let (archiver, dir) = temp_archiver(false);
        let fp = fingerprint("SELECT 1 FROM t");

        archiver.record(ArchiveRecord {
            fingerprint: &fp,
            query: "SELECT 1 FROM t",
            normalized_query: "SELECT 1 FROM t",
            explain_query: "EXPLAIN (TYPE IO) SELECT 1 FROM t",
            explain_type: "IO",
            raw: json!({}),
            parsed: None,
            error: None,
            note: None,
        });

        assert!(!dir.exists());
    }
}
