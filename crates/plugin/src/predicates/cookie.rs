use hyper::header;
use regex::Regex;
use relaygate_kernel::Exchange;
use serde::Deserialize;

use super::full_match;
use crate::{BoxError, PredicateFactory, RoutePredicate};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CookieConfig {
    pub name: String,
    pub regexp: String,
}

/// Holds when a cookie called `name` has a value matching `regexp`.
#[derive(Debug, Clone)]
pub struct CookiePredicate {
    pub name: String,
    pub regexp: Regex,
}

fn cookies(exchange: &Exchange) -> impl Iterator<Item = (&str, &str)> {
    exchange
        .request()
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
}

impl RoutePredicate for CookiePredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        Ok(cookies(exchange).any(|(name, value)| name == self.name && self.regexp.is_match(value.trim_matches('"'))))
    }
}

impl PredicateFactory for CookiePredicate {
    const NAME: &'static str = "cookie";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["name", "regexp"];
    type Config = CookieConfig;
    fn create(config: CookieConfig) -> Result<Self, BoxError> {
        Ok(Self {
            name: config.name,
            regexp: full_match(&config.regexp)?,
        })
    }
}
