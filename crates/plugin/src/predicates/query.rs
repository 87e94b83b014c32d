use regex::Regex;
use relaygate_kernel::{utils::QueryKvIter, Exchange};
use serde::Deserialize;

use super::full_match;
use crate::{BoxError, PredicateFactory, RoutePredicate};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    pub param: String,
    #[serde(default)]
    pub regexp: Option<String>,
}

/// Holds when the query parameter `param` is present, and one of its values matches `regexp` if
/// set.
#[derive(Debug, Clone)]
pub struct QueryPredicate {
    pub param: String,
    pub regexp: Option<Regex>,
}

impl RoutePredicate for QueryPredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        let query = exchange.request().uri().query().unwrap_or_default();
        let mut values = QueryKvIter::new(query).filter(|(key, _)| *key == self.param).map(|(_, value)| value.unwrap_or_default());
        Ok(match &self.regexp {
            Some(regexp) => values.any(|value| regexp.is_match(value)),
            None => values.next().is_some(),
        })
    }
}

impl PredicateFactory for QueryPredicate {
    const NAME: &'static str = "query";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["param", "regexp"];
    type Config = QueryConfig;
    fn create(config: QueryConfig) -> Result<Self, BoxError> {
        Ok(Self {
            param: config.param,
            regexp: config.regexp.as_deref().map(full_match).transpose()?,
        })
    }
}
