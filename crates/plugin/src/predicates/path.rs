use relaygate_kernel::Exchange;
use serde::Deserialize;

use crate::{binding::parse, path_pattern::PathPattern, BoxError, PredicateFactory, RoutePredicate, ShortcutType};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathConfig {
    pub patterns: Vec<String>,
    #[serde(default = "default_true", deserialize_with = "parse")]
    pub match_trailing_slash: bool,
}

/// Holds when the request path matches any of the patterns.
///
/// With `match_trailing_slash`, `/foo/` also matches a pattern `/foo`.
#[derive(Debug, Clone)]
pub struct PathPredicate {
    pub patterns: Vec<PathPattern>,
    pub match_trailing_slash: bool,
}

impl PathPredicate {
    pub fn matches(&self, path: &str) -> bool {
        let trimmed = match path.strip_suffix('/') {
            Some(trimmed) if self.match_trailing_slash && !trimmed.is_empty() => Some(trimmed),
            _ => None,
        };
        self.patterns.iter().any(|pattern| pattern.matches(path).is_some() || trimmed.is_some_and(|trimmed| pattern.matches(trimmed).is_some()))
    }
}

impl RoutePredicate for PathPredicate {
    async fn test(&self, exchange: &Exchange) -> Result<bool, BoxError> {
        let path = exchange.request().uri().path();
        let matched = self.matches(path);
        tracing::trace!(path, matched, "[Rg.Predicate.Path] tested");
        Ok(matched)
    }
}

impl PredicateFactory for PathPredicate {
    const NAME: &'static str = "path";
    const SHORTCUT_FIELDS: &'static [&'static str] = &["patterns", "match_trailing_slash"];
    const SHORTCUT_TYPE: ShortcutType = ShortcutType::GatherListTailFlag;
    type Config = PathConfig;
    fn create(config: PathConfig) -> Result<Self, BoxError> {
        if config.patterns.is_empty() {
            return Err("at least one pattern is required".into());
        }
        Ok(Self {
            patterns: config.patterns.iter().map(|pattern| PathPattern::new(pattern, '/')).collect::<Result<_, _>>()?,
            match_trailing_slash: config.match_trailing_slash,
        })
    }
}

#[cfg(test)]
mod test {
    use hyper::Request;

    use crate::predicates::test_util::{builds, check};

    fn get(uri: &str) -> Request<()> {
        Request::get(uri).body(()).expect("valid request")
    }

    #[tokio::test]
    async fn test_path() {
        assert!(check("path=/red/{segment},/blue/**", get("/red/1")).await);
        assert!(check("path=/red/{segment},/blue/**", get("/blue/a/b?x=1")).await);
        assert!(!check("path=/red/{segment},/blue/**", get("/green")).await);
    }

    #[tokio::test]
    async fn test_trailing_slash() {
        assert!(check("path=/red", get("/red/")).await);
        assert!(!check("path=/red,false", get("/red/")).await);
        assert!(check("path=/", get("/")).await);
        assert!(!builds("path"));
    }
}
