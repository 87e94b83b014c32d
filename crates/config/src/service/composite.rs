use std::sync::Arc;

use futures_util::{stream, stream::BoxStream, StreamExt};
use relaygate_model::{BoxError, RouteDefinition};

use super::RouteDefinitionLocator;

/// Concatenates the definitions of several locators, in locator order.
///
/// An error of one locator is yielded in place and the following locators are still read.
#[derive(Clone, Default)]
pub struct CompositeLocator {
    locators: Vec<Arc<dyn RouteDefinitionLocator>>,
}

impl std::fmt::Debug for CompositeLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeLocator").field("locators", &self.locators.len()).finish()
    }
}

impl CompositeLocator {
    pub fn new(locators: Vec<Arc<dyn RouteDefinitionLocator>>) -> Self {
        Self { locators }
    }
    #[must_use]
    pub fn with(mut self, locator: impl RouteDefinitionLocator + 'static) -> Self {
        self.locators.push(Arc::new(locator));
        self
    }
}

impl RouteDefinitionLocator for CompositeLocator {
    fn route_definitions(&self) -> BoxStream<'_, Result<RouteDefinition, BoxError>> {
        stream::iter(self.locators.iter()).flat_map(|locator| locator.route_definitions()).boxed()
    }
}
