use hyper::header::HeaderName;
use regex::Regex;
use relaygate_kernel::Exchange;
use serde::Deserialize;

use super::full_match;
use crate::{BoxError, PredicateFactory, RoutePredicate};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderConfig {
    pub header: String,
    #[serde(default)]
    pub regexp: Option<String>,
}

/// Holds when some value of `header` matches `regexp`, or when the header is present if there is
/// no `regexp`.
#[derive(Debug, Clone)]
pub struct HeaderPredicate {
    pub header: HeaderName,
    pub regexp: Option<Regex>,
}

impl RoutePredicate for HeaderPredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        let mut values = exchange.request().headers().get_all(&self.header).iter();
        Ok(match &self.regexp {
            Some(regexp) => values.any(|value| value.to_str().is_ok_and(|value| regexp.is_match(value))),
            None => values.next().is_some(),
        })
    }
}

impl PredicateFactory for HeaderPredicate {
    const NAME: &'static str = "header";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["header", "regexp"];
    type Config = HeaderConfig;
    fn create(config: HeaderConfig) -> Result<Self, BoxError> {
        Ok(Self {
            header: HeaderName::from_bytes(config.header.trim().as_bytes())?,
            regexp: config.regexp.as_deref().map(full_match).transpose()?,
        })
    }
}
