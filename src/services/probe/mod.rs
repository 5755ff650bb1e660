//! Cost probing against the default backend.
//!
//! A probe submits `EXPLAIN (TYPE IO)` for the (catalog-normalized) statement
//! through the regular statement protocol and follows the `nextUri` chain
//! until the backend finishes. When the IO explain yields nothing usable the
//! probe falls back to `EXPLAIN (TYPE DISTRIBUTED)` and scrapes the text
//! plan. View and catalog resolution errors skip the fallback entirely, since
//! it would fail for the same reason.
//!
//! Probing is never fatal: every failure collapses into a typed outcome the
//! decision engine treats as an empty estimate.

mod io_plan;
mod text_plan;

pub use io_plan::parse_io_plan;
pub use text_plan::parse_distributed_plan;

use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::models::{ProbeOutcome, ProbeResult};
use crate::services::archiver::{ArchiveRecord, ExplainArchiver};
use crate::services::catalog::normalize_catalog;
use crate::services::fingerprint::fingerprint;

/// Error message fragments that identify a view/catalog resolution failure.
const VIEW_ERROR_MARKERS: [&str; 5] =
    ["failed analyzing stored view", "catalog", "not found", "view", "cannot be resolved"];

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend reported error: {0}")]
    Backend(String),
    #[error("no data rows returned")]
    NoData,
}

pub fn is_view_error(message: &str) -> bool {
    let lowered = message.to_lowercase();
    VIEW_ERROR_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Char-boundary-safe single-line preview for log events.
fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().replace('\n', " ")
}

pub struct IoProbe {
    http_client: Client,
    base_url: String,
    user: String,
    archiver: Arc<ExplainArchiver>,
}

impl IoProbe {
    pub fn new(config: &Config, archiver: Arc<ExplainArchiver>) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.probe.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build probe HTTP client: {}. Using defaults.", e);
                Client::default()
            });

        Self {
            http_client,
            base_url: config.clusters.ecs.internal_url.clone(),
            user: config.probe.user.clone(),
            archiver,
        }
    }

    /// Probe one statement. Archives every outcome; never fails the caller.
    pub async fn probe(&self, sql: &str) -> ProbeOutcome {
        let fp = fingerprint(sql);
        let normalized = normalize_catalog(sql);

        match self.try_explain_io(sql, &normalized, &fp).await {
            IoAttempt::Parsed(result) => ProbeOutcome::Parsed(result),
            IoAttempt::ViewError(message) => {
                tracing::info!("explain_io view_error_detected skipping_distributed");
                ProbeOutcome::ViewError { message }
            },
            IoAttempt::Fallback(reason) => {
                tracing::info!("explain_io fallback_to_distributed reason={}", reason);
                self.try_explain_distributed(sql, &normalized, &fp).await
            },
        }
    }

    async fn try_explain_io(&self, original: &str, normalized: &str, fp: &str) -> IoAttempt {
        let explain_query = format!("EXPLAIN (TYPE IO) {}", normalized);
        tracing::info!("explain_io running query_preview={}", preview(&explain_query, 80));

        let rows = match self.execute_statement(&explain_query).await {
            Ok(rows) => rows,
            Err(ProbeError::Backend(message)) if is_view_error(&message) => {
                self.archiver.record(ArchiveRecord {
                    fingerprint: fp,
                    query: original,
                    normalized_query: normalized,
                    explain_query: &explain_query,
                    explain_type: "IO",
                    raw: Value::Null,
                    parsed: None,
                    error: Some(message.clone()),
                    note: Some("View references unavailable catalog".to_string()),
                });
                return IoAttempt::ViewError(message);
            },
            Err(e) => {
                self.archiver.record(ArchiveRecord {
                    fingerprint: fp,
                    query: original,
                    normalized_query: normalized,
                    explain_query: &explain_query,
                    explain_type: "IO",
                    raw: Value::Null,
                    parsed: None,
                    error: Some(e.to_string()),
                    note: None,
                });
                return IoAttempt::Fallback(e.to_string());
            },
        };

        let Some(payload) = rows.first().and_then(|row| row.get(0)).and_then(Value::as_str) else {
            self.archiver.record(ArchiveRecord {
                fingerprint: fp,
                query: original,
                normalized_query: normalized,
                explain_query: &explain_query,
                explain_type: "IO",
                raw: Value::Null,
                parsed: None,
                error: Some("Empty explain payload".to_string()),
                note: None,
            });
            return IoAttempt::Fallback("empty_payload".to_string());
        };

        // The IO plan arrives as a JSON string with embedded newlines
        let cleaned = payload.replace("\\n", " ").replace('\n', " ");
        let explain_json: Value = match serde_json::from_str(&cleaned) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("explain_io parse_error error={}", e);
                self.archiver.record(ArchiveRecord {
                    fingerprint: fp,
                    query: original,
                    normalized_query: normalized,
                    explain_query: &explain_query,
                    explain_type: "IO",
                    raw: Value::String(cleaned.chars().take(500).collect()),
                    parsed: None,
                    error: Some(e.to_string()),
                    note: None,
                });
                return IoAttempt::Fallback("parse_error".to_string());
            },
        };

        let table_count = explain_json
            .get("inputTableColumnInfos")
            .and_then(Value::as_array)
            .map(|a| a.len())
            .unwrap_or(0);
        if table_count == 0 {
            self.archiver.record(ArchiveRecord {
                fingerprint: fp,
                query: original,
                normalized_query: normalized,
                explain_query: &explain_query,
                explain_type: "IO",
                raw: explain_json,
                parsed: None,
                error: None,
                note: Some("No tables found - may be a view".to_string()),
            });
            return IoAttempt::Fallback("no_tables_found".to_string());
        }

        let parsed = parse_io_plan(&explain_json);
        tracing::debug!("explain_io parsed tables={}", parsed.tables.len());
        self.archiver.record(ArchiveRecord {
            fingerprint: fp,
            query: original,
            normalized_query: normalized,
            explain_query: &explain_query,
            explain_type: "IO",
            raw: explain_json,
            parsed: Some(&parsed),
            error: None,
            note: None,
        });
        IoAttempt::Parsed(parsed)
    }

    async fn try_explain_distributed(
        &self,
        original: &str,
        normalized: &str,
        fp: &str,
    ) -> ProbeOutcome {
        let explain_query = format!("EXPLAIN (TYPE DISTRIBUTED) {}", normalized);
        tracing::info!(
            "explain_distributed running query_preview={}",
            preview(&explain_query, 80)
        );

        let rows = match self.execute_statement(&explain_query).await {
            Ok(rows) => rows,
            Err(ProbeError::Backend(message)) if is_view_error(&message) => {
                tracing::warn!(
                    "explain_distributed view_error detected error={}",
                    preview(&message, 200)
                );
                return ProbeOutcome::ViewError { message };
            },
            Err(e) => {
                tracing::warn!("explain_distributed error={}", e);
                return ProbeOutcome::Empty { reason: e.to_string() };
            },
        };

        let plan_text = rows
            .iter()
            .filter_map(|row| row.get(0).and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");

        let parsed = parse_distributed_plan(&plan_text);
        if parsed.tables.is_empty() {
            tracing::warn!("explain_distributed no_tables_extracted");
            self.archiver.record(ArchiveRecord {
                fingerprint: fp,
                query: original,
                normalized_query: normalized,
                explain_query: &explain_query,
                explain_type: "DISTRIBUTED",
                raw: Value::String(plan_text.chars().take(2000).collect()),
                parsed: None,
                error: Some("No tables extracted from distributed plan".to_string()),
                note: None,
            });
            return ProbeOutcome::Empty { reason: "no_tables_extracted".to_string() };
        }

        tracing::info!("explain_distributed extracted tables={}", parsed.tables.len());
        self.archiver.record(ArchiveRecord {
            fingerprint: fp,
            query: original,
            normalized_query: normalized,
            explain_query: &explain_query,
            explain_type: "DISTRIBUTED",
            raw: Value::String(plan_text.chars().take(5000).collect()),
            parsed: Some(&parsed),
            error: None,
            note: Some("Fallback from IO explain".to_string()),
        });
        ProbeOutcome::Parsed(parsed)
    }

    /// Run one statement through the protocol, following the nextUri chain
    /// and accumulating data rows until the backend reports a terminal state.
    async fn execute_statement(&self, sql: &str) -> Result<Vec<Value>, ProbeError> {
        let url = format!("{}/v1/statement", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .header("Content-Type", "text/plain")
            .header("X-Trino-User", &self.user)
            .body(sql.to_string())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("trino_query_failed status={} body={}", status, preview(&body, 200));
            return Err(ProbeError::Status { status, body });
        }

        let mut envelope: Value = response.json().await?;
        let mut all_rows: Vec<Value> = Vec::new();

        loop {
            if let Some(error) = envelope.get("error") {
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                tracing::error!("trino_query_error message={}", preview(&message, 200));
                return Err(ProbeError::Backend(message));
            }

            if let Some(rows) = envelope.get("data").and_then(Value::as_array) {
                all_rows.extend(rows.iter().cloned());
            }

            let state = envelope
                .get("stats")
                .and_then(|s| s.get("state"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if state == "FINISHED" {
                break;
            }

            let Some(next_uri) =
                envelope.get("nextUri").and_then(Value::as_str).map(str::to_string)
            else {
                break;
            };

            let next_response = self
                .http_client
                .get(&next_uri)
                .header("X-Trino-User", &self.user)
                .send()
                .await?;
            if !next_response.status().is_success() {
                tracing::error!("trino_next_uri_failed status={}", next_response.status());
                break;
            }
            envelope = next_response.json().await?;
        }

        if all_rows.is_empty() {
            return Err(ProbeError::NoData);
        }
        Ok(all_rows)
    }
}

enum IoAttempt {
    Parsed(ProbeResult),
    ViewError(String),
    Fallback(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_error_classification() {
        assert!(is_view_error("Failed analyzing stored view 'reports.daily'"));
        assert!(is_view_error("Catalog 'iceberg' not found"));
        assert!(is_view_error("line 1:15: Table 'x.y' cannot be resolved"));
        assert!(is_view_error("VIEW is stale"));
        assert!(!is_view_error("Division by zero"));
        assert!(!is_view_error("Query exceeded memory limit"));
    }
}
