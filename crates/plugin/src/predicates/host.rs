use hyper::header;
use relaygate_kernel::{utils::HostAndPort, Exchange};
use serde::Deserialize;

use crate::{path_pattern::PathPattern, BoxError, PredicateFactory, RoutePredicate, ShortcutType};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    pub patterns: Vec<String>,
}

/// Holds when the request host, without port, matches one of the patterns.
///
/// Labels are matched like path segments, so `**.example.org` matches any subdomain.
#[derive(Debug, Clone)]
pub struct HostPredicate {
    pub patterns: Vec<PathPattern>,
}

fn request_host(exchange: &Exchange) -> Option<String> {
    let request = exchange.request();
    let host = match request.headers().get(header::HOST) {
        Some(host) => host.to_str().ok()?,
        None => request.uri().authority()?.as_str(),
    };
    Some(HostAndPort::parse(host).host.to_ascii_lowercase())
}

impl RoutePredicate for HostPredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        let Some(host) = request_host(exchange) else {
            return Ok(false);
        };
        Ok(self.patterns.iter().any(|pattern| pattern.matches(&host).is_some()))
    }
}

impl PredicateFactory for HostPredicate {
    const NAME: &'static str = "host";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["patterns"];
    const SHORTCUT_TYPE: ShortcutType = ShortcutType::GatherList;
    type Config = HostConfig;
    fn create(config: HostConfig) -> Result<Self, BoxError> {
        let patterns = config.patterns.iter().map(|pattern| PathPattern::new(&pattern.trim().to_ascii_lowercase(), '.')).collect::<Result<_, _>>()?;
        Ok(Self { patterns })
    }
}
