use serde::{Deserialize, Serialize};

use super::{FilterDefinition, PredicateDefinition};

/// A declarative route: where to send matching requests, how to match them and which filters to run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RouteDefinition {
    /// Route id, used in logs and diagnostics. Uniqueness is not enforced.
    pub id: String,
    /// Target uri, the scheme is one of `http`, `https` or `forward`.
    pub uri: String,
    /// Predicates of this route, all of them must hold.
    pub predicates: Vec<PredicateDefinition>,
    /// Route specific filters, applied after the default filters.
    pub filters: Vec<FilterDefinition>,
    /// Route priority, the lower value is tried first.
    pub order: i32,
    /// Response timeout for this route, overrides the gateway wide client timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RouteDefinition {
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            ..Default::default()
        }
    }
    pub fn predicate(mut self, predicate: PredicateDefinition) -> Self {
        self.predicates.push(predicate);
        self
    }
    pub fn filter(mut self, filter: FilterDefinition) -> Self {
        self.filters.push(filter);
        self
    }
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}
