//! Outbound HTTP clients, one per concern.
//!
//! Each client carries its concern's timeout so call sites never choose one
//! ad hoc: the data client covers submissions and follow-ups, the keep-alive
//! client covers liveness statements, and the control client covers info,
//! UI-gateway and other short control requests.

use reqwest::Client;
use std::time::Duration;

use crate::config::Config;

const KEEPALIVE_TIMEOUT_SECS: u64 = 5;

pub struct GatewayClients {
    pub data: Client,
    pub keepalive: Client,
    pub control: Client,
}

impl GatewayClients {
    pub fn new(config: &Config) -> Self {
        Self {
            data: build_client(Duration::from_secs(config.proxy.data_timeout_secs)),
            keepalive: build_client(Duration::from_secs(KEEPALIVE_TIMEOUT_SECS)),
            control: build_client(Duration::from_secs(config.proxy.routing_timeout_secs)),
        }
    }
}

fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
        tracing::error!("Failed to build HTTP client: {}. Using defaults.", e);
        Client::default()
    })
}
