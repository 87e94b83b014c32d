//! Time window predicates: `after`, `before` and `between`.
use chrono::{DateTime, FixedOffset, Utc};
use relaygate_kernel::Exchange;
use serde::Deserialize;

use crate::{BoxError, PredicateFactory, RoutePredicate};

/// Parse an rfc 3339 datetime, a trailing `[Zone/Id]` is ignored.
pub fn parse_datetime(text: &str) -> Result<DateTime<FixedOffset>, BoxError> {
    let text = text.trim();
    let text = text.split_once('[').map_or(text, |(datetime, _zone)| datetime);
    DateTime::parse_from_rfc3339(text).map_err(|e| format!("invalid datetime `{text}`: {e}").into())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatetimeConfig {
    pub datetime: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BetweenConfig {
    pub datetime1: String,
    pub datetime2: String,
}

/// Holds after `datetime`.
#[derive(Debug, Clone)]
pub struct AfterPredicate {
    pub datetime: DateTime<FixedOffset>,
}

impl RoutePredicate for AfterPredicate {
    async fn test(&self, _exchange: &Exchange) -> Result<bool, BoxError> {
        Ok(Utc::now() > self.datetime)
    }
}

impl PredicateFactory for AfterPredicate {
    const NAME: &'static str = "after";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["datetime"];
    type Config = DatetimeConfig;
    fn create(config: DatetimeConfig) -> Result<Self, BoxError> {
        Ok(Self {
            datetime: parse_datetime(&config.datetime)?,
        })
    }
}

/// Holds before `datetime`.
#[derive(Debug, Clone)]
pub struct BeforePredicate {
    pub datetime: DateTime<FixedOffset>,
}

impl RoutePredicate for BeforePredicate {
    async fn test(&self, _exchange: &Exchange) -> Result<bool, BoxError> {
        Ok(Utc::now() < self.datetime)
    }
}

impl PredicateFactory for BeforePredicate {
    const NAME: &'static str = "before";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["datetime"];
    type Config = DatetimeConfig;
    fn create(config: DatetimeConfig) -> Result<Self, BoxError> {
        Ok(Self {
            datetime: parse_datetime(&config.datetime)?,
        })
    }
}

/// Holds strictly between `start` and `end`.
#[derive(Debug, Clone)]
pub struct BetweenPredicate {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl RoutePredicate for BetweenPredicate {
    async fn test(&self, _exchange: &Exchange) -> Result<bool, BoxError> {
        let now = Utc::now();
        Ok(now > self.start && now < self.end)
    }
}

impl PredicateFactory for BetweenPredicate {
    const NAME: &'static str = "between";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["datetime1", "datetime2"];
    type Config = BetweenConfig;
    fn create(config: BetweenConfig) -> Result<Self, BoxError> {
        let start = parse_datetime(&config.datetime1)?;
        let end = parse_datetime(&config.datetime2)?;
        if start >= end {
            return Err(format!("datetime1 `{start}` must be before datetime2 `{end}`").into());
        }
        Ok(Self { start, end })
    }
}

#[cfg(test)]
mod test {
    use hyper::Request;

    use super::*;
    use crate::predicates::test_util::{builds, check};

    #[test]
    fn test_parse_datetime() {
        let with_zone = parse_datetime("2017-01-20T17:42:47.789-07:00[America/Denver]").expect("valid datetime");
        let without_zone = parse_datetime("2017-01-20T17:42:47.789-07:00").expect("valid datetime");
        assert_eq!(with_zone, without_zone);
        assert!(parse_datetime("yesterday").is_err());
    }

    #[tokio::test]
    async fn test_time_window() {
        assert!(check("after=2000-01-01T00:00:00Z", Request::new(())).await);
        assert!(!check("after=2999-01-01T00:00:00+08:00[Asia/Shanghai]", Request::new(())).await);
        assert!(check("before=2999-01-01T00:00:00Z", Request::new(())).await);
        assert!(!check("before=2000-01-01T00:00:00Z", Request::new(())).await);
        assert!(check("between=2000-01-01T00:00:00Z,2999-01-01T00:00:00Z", Request::new(())).await);
        assert!(!check("between=2998-01-01T00:00:00Z,2999-01-01T00:00:00Z", Request::new(())).await);
        assert!(!builds("between=2999-01-01T00:00:00Z,2000-01-01T00:00:00Z"));
    }
}
