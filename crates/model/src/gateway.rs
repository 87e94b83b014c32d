use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{constants, FilterDefinition, RouteDefinition};

/// Everything needed to run one gateway instance.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub http_client: HttpClientConfig,
    /// Filters prepended to the filters of every route.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_filters: Vec<FilterDefinition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteDefinition>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Gateway name, shows up in logs.
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Size of the worker pool, defaults to the number of cpus.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: constants::DEFAULT_GATEWAY_NAME.to_string(),
            host: constants::DEFAULT_HOST.to_string(),
            port: constants::DEFAULT_PORT,
            worker_threads: None,
        }
    }
}

/// Settings of the upstream http client.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct HttpClientConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,
    /// Time allowed for the upstream to answer, unlimited when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_idle_timeout_ms: Option<u64>,
}

impl HttpClientConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
    pub fn pool_idle_timeout(&self) -> Option<Duration> {
        self.pool_idle_timeout_ms.map(Duration::from_millis)
    }
}
