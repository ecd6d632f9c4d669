use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use super::errors::ConfigError;

/// Resolver that sits behind the audit handler when running as a standalone server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_upstream_server")]
    pub server: String,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            server: default_upstream_server(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl UpstreamConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.parse().map_err(|e| {
            ConfigError::Validation(format!("Invalid upstream server '{}': {}", self.server, e))
        })
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

fn default_upstream_server() -> String {
    "8.8.8.8:53".to_string()
}

fn default_query_timeout_ms() -> u64 {
    2000
}
