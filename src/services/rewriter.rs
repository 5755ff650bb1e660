//! Response-body URL rewriting.
//!
//! Backend responses carry `nextUri` and UI links pointing at the cluster's
//! internal address, which clients cannot reach. In bypass mode those links
//! are rewritten to the chosen cluster's external URL so follow-ups go to
//! the backend directly; in proxy mode every cluster's links are rewritten
//! to the gateway's public URL so all traffic stays tunneled.

use regex::Regex;

use crate::config::Config;
use crate::models::ClusterName;

struct ClusterRules {
    cluster: ClusterName,
    statement_urls: Regex,
    ui_urls: Regex,
    external_url: String,
}

pub struct UrlRewriter {
    rules: Vec<ClusterRules>,
    bypass_mode: bool,
    public_url: String,
}

impl UrlRewriter {
    pub fn new(config: &Config) -> Self {
        let rules = config
            .clusters
            .iter()
            .map(|(cluster, endpoints)| {
                let escaped = regex::escape(&endpoints.internal_url);
                ClusterRules {
                    cluster,
                    // Statement protocol links: <internal>/v1/statement/...
                    statement_urls: Regex::new(&format!(r#"{}(/v1/statement/[^"]+)"#, escaped))
                        .expect("statement URL pattern"),
                    // UI links: <internal>/ui/...
                    ui_urls: Regex::new(&format!(r#"{}(/ui/[^"]+)"#, escaped))
                        .expect("ui URL pattern"),
                    external_url: endpoints.external_url.clone(),
                }
            })
            .collect();

        Self {
            rules,
            bypass_mode: config.proxy.bypass_mode,
            public_url: config.proxy.public_url.clone(),
        }
    }

    pub fn bypass_mode(&self) -> bool {
        self.bypass_mode
    }

    /// Rewrite backend URLs in a UTF-8 body. `cluster` is the cluster the
    /// response came from; it only matters in bypass mode, where just that
    /// cluster's links are redirected to its external URL.
    pub fn rewrite(&self, content: &str, cluster: ClusterName) -> String {
        if self.bypass_mode {
            self.rewrite_for_bypass(content, cluster)
        } else {
            self.rewrite_for_proxy(content)
        }
    }

    fn rewrite_for_bypass(&self, content: &str, cluster: ClusterName) -> String {
        let Some(rule) = self.rules.iter().find(|rule| rule.cluster == cluster) else {
            return content.to_string();
        };

        let replacement = format!("{}$1", rule.external_url);
        let rewritten = rule.statement_urls.replace_all(content, replacement.as_str());
        rule.ui_urls.replace_all(&rewritten, replacement.as_str()).into_owned()
    }

    fn rewrite_for_proxy(&self, content: &str) -> String {
        let replacement = format!("{}$1", self.public_url);
        let mut rewritten = content.to_string();
        for rule in &self.rules {
            rewritten =
                rule.statement_urls.replace_all(&rewritten, replacement.as_str()).into_owned();
            rewritten = rule.ui_urls.replace_all(&rewritten, replacement.as_str()).into_owned();
        }
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bypass_mode: bool) -> Config {
        let mut config = Config::default();
        config.proxy.bypass_mode = bypass_mode;
        config.proxy.public_url = "http://gateway.example.com:8080".to_string();
        config
    }

    const SUBMISSION_BODY: &str = concat!(
        r#"{"id":"20240131_104500_00042_abcde","#,
        r#""infoUri":"http://trino-ecs:8080/ui/query.html?20240131_104500_00042_abcde","#,
        r#""nextUri":"http://trino-ecs:8080/v1/statement/queued/20240131_104500_00042_abcde/1","#,
        r#""stats":{"state":"QUEUED"}}"#
    );

    #[test]
    fn test_bypass_rewrites_chosen_cluster_to_external() {
        let rewriter = UrlRewriter::new(&config(true));
        let out = rewriter.rewrite(SUBMISSION_BODY, ClusterName::Ecs);

        assert!(out.contains(
            "http://localhost:8081/v1/statement/queued/20240131_104500_00042_abcde/1"
        ));
        assert!(out.contains("http://localhost:8081/ui/query.html"));
        assert!(!out.contains("http://trino-ecs:8080"));
    }

    #[test]
    fn test_bypass_leaves_other_clusters_alone() {
        let rewriter = UrlRewriter::new(&config(true));
        // Response attributed to emr-standard: ecs URLs are not its links
        let out = rewriter.rewrite(SUBMISSION_BODY, ClusterName::EmrStandard);
        assert!(out.contains("http://trino-ecs:8080"));
    }

    #[test]
    fn test_proxy_mode_rewrites_all_clusters_to_public_url() {
        let rewriter = UrlRewriter::new(&config(false));
        let body = SUBMISSION_BODY.replace("trino-ecs", "trino-emr-optimized");
        let out = rewriter.rewrite(&body, ClusterName::EmrOptimized);

        assert!(out.contains(
            "http://gateway.example.com:8080/v1/statement/queued/20240131_104500_00042_abcde/1"
        ));
        assert!(out.contains("http://gateway.example.com:8080/ui/query.html"));
        assert!(!out.contains("trino-emr-optimized"));
    }

    #[test]
    fn test_proxy_mode_ignores_response_cluster() {
        let rewriter = UrlRewriter::new(&config(false));
        // Proxy mode rewrites every cluster's links regardless of attribution
        let out = rewriter.rewrite(SUBMISSION_BODY, ClusterName::EmrOptimized);
        assert!(!out.contains("http://trino-ecs:8080"));
        assert!(out.contains("http://gateway.example.com:8080/v1/statement/"));
    }

    #[test]
    fn test_unrelated_urls_untouched() {
        let rewriter = UrlRewriter::new(&config(true));
        let body = r#"{"dataUri":"https://example.com/v1/statement/x","other":"http://trino-ecs:8080/metrics"}"#;
        assert_eq!(rewriter.rewrite(body, ClusterName::Ecs), body);
    }
}
