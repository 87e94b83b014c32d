//! Path prefix filters.
use relaygate_kernel::{
    filter::{Flow, Next},
    Exchange, GatewayError,
};
use serde::Deserialize;

use super::rewrite_request_path;
use crate::{binding::parse, BoxError, FilterFactory, GatewayFilter};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StripPrefixConfig {
    #[serde(deserialize_with = "parse")]
    pub parts: usize,
}

/// Drops the first `parts` segments of the request path.
#[derive(Debug, Clone)]
pub struct StripPrefixFilter {
    pub parts: usize,
}

impl StripPrefixFilter {
    pub fn strip(&self, path: &str) -> String {
        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).skip(self.parts).collect();
        let mut stripped = format!("/{}", segments.join("/"));
        if stripped.len() > 1 && path.ends_with('/') {
            stripped.push('/');
        }
        stripped
    }
}

impl GatewayFilter for StripPrefixFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let stripped = self.strip(exchange.request().uri().path());
        rewrite_request_path(exchange, &stripped)?;
        Ok(next.proceed())
    }
}

impl FilterFactory for StripPrefixFilter {
    const NAME: &'static str = "strip-prefix";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["parts"];
    type Config = StripPrefixConfig;
    fn create(config: StripPrefixConfig) -> Result<Self, BoxError> {
        Ok(Self { parts: config.parts })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefixPathConfig {
    pub prefix: String,
}

/// Puts `prefix` in front of the request path.
#[derive(Debug, Clone)]
pub struct PrefixPathFilter {
    pub prefix: String,
}

impl GatewayFilter for PrefixPathFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let prefixed = format!("{}{}", self.prefix, exchange.request().uri().path());
        rewrite_request_path(exchange, &prefixed)?;
        Ok(next.proceed())
    }
}

impl FilterFactory for PrefixPathFilter {
    const NAME: &'static str = "prefix-path";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["prefix"];
    type Config = PrefixPathConfig;
    fn create(config: PrefixPathConfig) -> Result<Self, BoxError> {
        if !config.prefix.starts_with('/') {
            return Err(format!("prefix `{}` must start with `/`", config.prefix).into());
        }
        Ok(Self {
            prefix: config.prefix.trim_end_matches('/').to_string(),
        })
    }
}
