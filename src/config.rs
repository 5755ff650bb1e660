use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::models::ClusterName;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub clusters: ClustersConfig,
    pub proxy: ProxyConfig,
    pub decision: DecisionConfig,
    pub probe: ProbeConfig,
    pub explains: ExplainsConfig,
    pub history: HistoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// One backend cluster: an internal URL reachable from the gateway and an
/// external URL reachable from clients (used only when rewriting in bypass mode).
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterEndpoints {
    pub internal_url: String,
    pub external_url: String,
}

impl ClusterEndpoints {
    fn new(internal_url: &str, external_url: &str) -> Self {
        Self { internal_url: internal_url.to_string(), external_url: external_url.to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClustersConfig {
    pub ecs: ClusterEndpoints,
    pub emr_standard: ClusterEndpoints,
    pub emr_optimized: ClusterEndpoints,
}

impl ClustersConfig {
    pub fn endpoints(&self, name: ClusterName) -> &ClusterEndpoints {
        match name {
            ClusterName::Ecs => &self.ecs,
            ClusterName::EmrStandard => &self.emr_standard,
            ClusterName::EmrOptimized => &self.emr_optimized,
        }
    }

    pub fn internal_url(&self, name: ClusterName) -> &str {
        &self.endpoints(name).internal_url
    }

    pub fn external_url(&self, name: ClusterName) -> &str {
        &self.endpoints(name).external_url
    }

    pub fn iter(&self) -> impl Iterator<Item = (ClusterName, &ClusterEndpoints)> {
        ClusterName::ALL.iter().map(move |name| (*name, self.endpoints(*name)))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// When true, rewritten URLs point clients directly at the chosen
    /// cluster's external URL; when false, clients stay tunneled through
    /// the gateway's public URL.
    pub bypass_mode: bool,
    /// Externally visible URL of this gateway (proxy mode rewriting target).
    pub public_url: String,
    /// GET responses at or above this many bytes are streamed unrewritten.
    pub streaming_threshold: u64,
    /// Seconds allowed for data-path requests (submissions and follow-ups).
    pub data_timeout_secs: u64,
    /// Seconds allowed for control requests (info, UI assets, sidecar calls).
    pub routing_timeout_secs: u64,
    /// Optional gateway serving the query UI; asset requests are proxied
    /// there first and fall back to the resolved cluster on failure.
    pub ui_gateway_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub weight_volume: f64,
    pub weight_complexity: f64,
    pub weight_historical: f64,
    pub ecs_threshold: f64,
    pub emr_standard_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// User submitted with probing statements.
    pub user: String,
    /// Seconds allowed per HTTP call while following a probe's nextUri chain.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExplainsConfig {
    pub enabled: bool,
    pub dir: String,
}

/// Coordinates of the durable decision store. The backend itself is an
/// external collaborator; these are passed through to whichever store
/// implementation is wired in.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub table: String,
    pub region: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

/// Command line arguments for configuration overrides
#[derive(Parser, Debug, Clone)]
#[command(name = "dyrasql")]
#[command(version, about = "DyraSQL - SQL routing gateway")]
pub struct CommandLineArgs {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Server host (overrides config file)
    #[arg(long, value_name = "HOST")]
    pub server_host: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, value_name = "PORT")]
    pub server_port: Option<u16>,

    /// URL rewriting mode (overrides config file)
    #[arg(long, value_name = "BOOL")]
    pub bypass_mode: Option<bool>,

    /// Streaming threshold in bytes (overrides config file)
    #[arg(long, value_name = "BYTES")]
    pub streaming_threshold: Option<u64>,

    /// Logging level (overrides config file, e.g., "info,dyrasql=debug")
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Directory for archived probe outcomes (overrides config file)
    #[arg(long, value_name = "PATH")]
    pub explains_dir: Option<String>,
}

impl Config {
    /// Load configuration with command line, environment variable, and file support
    ///
    /// Loading order (priority from highest to lowest):
    /// 1. Command line arguments
    /// 2. Environment variables
    /// 3. Configuration file (config.toml)
    /// 4. Default values
    pub fn load() -> Result<Self, anyhow::Error> {
        let cli_args = CommandLineArgs::parse();
        Self::load_with_args(&cli_args)
    }

    pub fn load_with_args(cli_args: &CommandLineArgs) -> Result<Self, anyhow::Error> {
        let config_path = cli_args.config.clone().or_else(Self::find_config_file);
        let mut config = if let Some(config_path) = config_path {
            Self::from_toml(&config_path)?
        } else {
            tracing::warn!("Configuration file not found, using defaults");
            Config::default()
        };

        config.apply_env_overrides();
        config.apply_cli_overrides(cli_args);
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - TRINO_ECS_URL / TRINO_EMR_STANDARD_URL / TRINO_EMR_OPTIMIZED_URL
    /// - TRINO_ECS_EXTERNAL_URL / TRINO_EMR_STANDARD_EXTERNAL_URL / TRINO_EMR_OPTIMIZED_EXTERNAL_URL
    /// - TRINO_GATEWAY_URL: UI gateway for asset requests
    /// - TRINO_USER: user submitted with probing statements
    /// - PROXY_PUBLIC_URL: rewriting target in proxy mode
    /// - BYPASS_MODE: URL rewriting mode (true/false)
    /// - STREAMING_THRESHOLD: bytes above which GET responses stream
    /// - DATA_TIMEOUT / ROUTING_TIMEOUT: seconds
    /// - DYRASQL_WEIGHT_VOLUME / DYRASQL_WEIGHT_COMPLEXITY / DYRASQL_WEIGHT_HISTORICAL
    /// - DYRASQL_ECS_THRESHOLD / DYRASQL_EMR_STANDARD_THRESHOLD
    /// - SAVE_EXPLAINS / EXPLAINS_DIR
    /// - DYRASQL_HISTORY_TABLE / DYRASQL_HISTORY_REGION
    /// - APP_SERVER_HOST / APP_SERVER_PORT / APP_LOG_LEVEL / APP_LOG_FILE
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Ok(port) = std::env::var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Ok(file) = std::env::var("APP_LOG_FILE") {
            self.logging.file = if file.is_empty() { None } else { Some(file) };
        }

        for (var, name) in [
            ("TRINO_ECS_URL", ClusterName::Ecs),
            ("TRINO_EMR_STANDARD_URL", ClusterName::EmrStandard),
            ("TRINO_EMR_OPTIMIZED_URL", ClusterName::EmrOptimized),
        ] {
            if let Ok(url) = std::env::var(var) {
                self.cluster_endpoints_mut(name).internal_url = url;
                tracing::info!("Override clusters.{}.internal_url from env", name);
            }
        }

        for (var, name) in [
            ("TRINO_ECS_EXTERNAL_URL", ClusterName::Ecs),
            ("TRINO_EMR_STANDARD_EXTERNAL_URL", ClusterName::EmrStandard),
            ("TRINO_EMR_OPTIMIZED_EXTERNAL_URL", ClusterName::EmrOptimized),
        ] {
            if let Ok(url) = std::env::var(var) {
                self.cluster_endpoints_mut(name).external_url = url;
                tracing::info!("Override clusters.{}.external_url from env", name);
            }
        }

        if let Ok(url) = std::env::var("TRINO_GATEWAY_URL") {
            self.proxy.ui_gateway_url = if url.is_empty() { None } else { Some(url) };
            tracing::info!("Override proxy.ui_gateway_url from env");
        }

        if let Ok(url) = std::env::var("PROXY_PUBLIC_URL") {
            self.proxy.public_url = url;
            tracing::info!("Override proxy.public_url from env: {}", self.proxy.public_url);
        }

        if let Ok(mode) = std::env::var("BYPASS_MODE") {
            self.proxy.bypass_mode = mode.trim().eq_ignore_ascii_case("true");
            tracing::info!("Override proxy.bypass_mode from env: {}", self.proxy.bypass_mode);
        }

        Self::parse_env("STREAMING_THRESHOLD", &mut self.proxy.streaming_threshold);
        Self::parse_env("DATA_TIMEOUT", &mut self.proxy.data_timeout_secs);
        Self::parse_env("ROUTING_TIMEOUT", &mut self.proxy.routing_timeout_secs);

        Self::parse_env("DYRASQL_WEIGHT_VOLUME", &mut self.decision.weight_volume);
        Self::parse_env("DYRASQL_WEIGHT_COMPLEXITY", &mut self.decision.weight_complexity);
        Self::parse_env("DYRASQL_WEIGHT_HISTORICAL", &mut self.decision.weight_historical);
        Self::parse_env("DYRASQL_ECS_THRESHOLD", &mut self.decision.ecs_threshold);
        Self::parse_env(
            "DYRASQL_EMR_STANDARD_THRESHOLD",
            &mut self.decision.emr_standard_threshold,
        );

        if let Ok(user) = std::env::var("TRINO_USER") {
            self.probe.user = user;
        }

        if let Ok(enabled) = std::env::var("SAVE_EXPLAINS") {
            self.explains.enabled = enabled.trim().eq_ignore_ascii_case("true");
            tracing::info!("Override explains.enabled from env: {}", self.explains.enabled);
        }

        if let Ok(dir) = std::env::var("EXPLAINS_DIR") {
            self.explains.dir = dir;
            tracing::info!("Override explains.dir from env: {}", self.explains.dir);
        }

        if let Ok(table) = std::env::var("DYRASQL_HISTORY_TABLE") {
            self.history.table = table;
        }

        if let Ok(region) = std::env::var("DYRASQL_HISTORY_REGION") {
            self.history.region = region;
        }
    }

    fn parse_env<T: std::str::FromStr + std::fmt::Display>(var: &str, slot: &mut T) {
        if let Ok(raw) = std::env::var(var) {
            match raw.trim().parse() {
                Ok(val) => {
                    *slot = val;
                    tracing::info!("Override {} from env: {}", var, slot);
                },
                Err(_) => tracing::warn!("Invalid {} '{}', keeping default", var, raw),
            }
        }
    }

    /// Apply command line argument overrides (highest priority)
    fn apply_cli_overrides(&mut self, args: &CommandLineArgs) {
        if let Some(host) = &args.server_host {
            self.server.host = host.clone();
            tracing::info!("Override server.host from CLI: {}", self.server.host);
        }

        if let Some(port) = args.server_port {
            self.server.port = port;
            tracing::info!("Override server.port from CLI: {}", self.server.port);
        }

        if let Some(mode) = args.bypass_mode {
            self.proxy.bypass_mode = mode;
            tracing::info!("Override proxy.bypass_mode from CLI: {}", self.proxy.bypass_mode);
        }

        if let Some(threshold) = args.streaming_threshold {
            self.proxy.streaming_threshold = threshold;
            tracing::info!(
                "Override proxy.streaming_threshold from CLI: {}",
                self.proxy.streaming_threshold
            );
        }

        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
            tracing::info!("Override logging.level from CLI: {}", self.logging.level);
        }

        if let Some(dir) = &args.explains_dir {
            self.explains.dir = dir.clone();
            tracing::info!("Override explains.dir from CLI: {}", self.explains.dir);
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        if self.proxy.streaming_threshold == 0 {
            anyhow::bail!("proxy.streaming_threshold must be > 0");
        }
        if self.proxy.data_timeout_secs == 0 || self.proxy.routing_timeout_secs == 0 {
            anyhow::bail!("proxy timeouts must be > 0");
        }
        if self.probe.timeout_secs == 0 {
            anyhow::bail!("probe.timeout_secs must be > 0");
        }

        let d = &self.decision;
        if !(0.0..=1.0).contains(&d.ecs_threshold)
            || !(0.0..=1.0).contains(&d.emr_standard_threshold)
            || d.ecs_threshold > d.emr_standard_threshold
        {
            anyhow::bail!(
                "decision thresholds must satisfy 0 <= ecs_threshold <= emr_standard_threshold <= 1"
            );
        }

        if self.history.ttl_hours <= 0 {
            anyhow::bail!("history.ttl_hours must be > 0");
        }

        // A weight sum away from 1.0 is suspicious but not fatal
        let total = d.weight_volume + d.weight_complexity + d.weight_historical;
        if (total - 1.0).abs() > 0.1 {
            tracing::warn!("decision weights sum={:.2} (expected 1.0)", total);
        }

        Ok(())
    }

    fn cluster_endpoints_mut(&mut self, name: ClusterName) -> &mut ClusterEndpoints {
        match name {
            ClusterName::Ecs => &mut self.clusters.ecs,
            ClusterName::EmrStandard => &mut self.clusters.emr_standard,
            ClusterName::EmrOptimized => &mut self.clusters.emr_optimized,
        }
    }

    fn find_config_file() -> Option<String> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                return Some(path.to_string());
            }
        }
        None
    }

    fn from_toml(path: &str) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for ClustersConfig {
    fn default() -> Self {
        Self {
            ecs: ClusterEndpoints::new("http://trino-ecs:8080", "http://localhost:8081"),
            emr_standard: ClusterEndpoints::new(
                "http://trino-emr-standard:8080",
                "http://localhost:8082",
            ),
            emr_optimized: ClusterEndpoints::new(
                "http://trino-emr-optimized:8080",
                "http://localhost:8083",
            ),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bypass_mode: true,
            public_url: "http://localhost:8080".to_string(),
            streaming_threshold: 65536,
            data_timeout_secs: 300,
            routing_timeout_secs: 5,
            ui_gateway_url: None,
        }
    }
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            weight_volume: 0.5,
            weight_complexity: 0.3,
            weight_historical: 0.2,
            ecs_threshold: 0.3,
            emr_standard_threshold: 0.7,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { user: "admin".to_string(), timeout_secs: 60 }
    }
}

impl Default for ExplainsConfig {
    fn default() -> Self {
        Self { enabled: true, dir: "/app/explains".to_string() }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { table: "dyrasql-history".to_string(), region: "us-east-1".to_string(), ttl_hours: 24 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,dyrasql=debug".to_string(),
            file: Some("logs/dyrasql.log".to_string()),
        }
    }
}
