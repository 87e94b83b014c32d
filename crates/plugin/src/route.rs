use std::{sync::Arc, time::Duration};

use relaygate_kernel::{
    filter::OrderedFilter,
    route::{Route, RouteTable, RouteUri},
    BoxError, GatewayError,
};
use relaygate_model::{FilterDefinition, RouteDefinition};
use tracing::{debug, instrument};

use crate::{FactoryRegistry, Predicate};

/// Compiles route definitions into routes, resolving every predicate and filter by name.
#[derive(Debug, Clone)]
pub struct RouteCompiler {
    registry: FactoryRegistry,
    default_filters: Arc<[FilterDefinition]>,
}

impl Default for RouteCompiler {
    fn default() -> Self {
        Self::new(FactoryRegistry::global().clone())
    }
}

impl RouteCompiler {
    pub fn new(registry: FactoryRegistry) -> Self {
        Self {
            registry,
            default_filters: Arc::new([]),
        }
    }
    /// Filters put in front of the filters of every route.
    #[must_use]
    pub fn with_default_filters(mut self, default_filters: impl IntoIterator<Item = FilterDefinition>) -> Self {
        self.default_filters = default_filters.into_iter().collect();
        self
    }
    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// Compile one definition.
    ///
    /// Predicates are combined with `and` in definition order. The filters are the default
    /// filters followed by the route filters; one without an explicit order is ordered by its
    /// 1-based position in that list.
    ///
    /// # Errors
    /// The first unknown name, binding failure or invalid uri.
    #[instrument(skip_all, fields(route = %definition.id))]
    pub fn compile(&self, definition: &RouteDefinition) -> Result<Route, GatewayError> {
        let uri: RouteUri = definition.uri.parse().map_err(|e: BoxError| GatewayError::InvalidUri {
            route: definition.id.clone(),
            uri: definition.uri.clone(),
            message: e.to_string(),
        })?;
        let predicates = definition.predicates.iter().map(|predicate| self.registry.predicate(&definition.id, predicate)).collect::<Result<Vec<_>, _>>()?;
        let filters = self
            .default_filters
            .iter()
            .chain(&definition.filters)
            .enumerate()
            .map(|(index, filter)| -> Result<OrderedFilter, GatewayError> {
                let position = i32::try_from(index + 1).unwrap_or(i32::MAX);
                Ok(self.registry.filter(&definition.id, filter)?.ordered_or(position))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let route = Route::builder(definition.id.as_str(), uri)
            .predicate(Predicate::all(predicates))
            .filters(filters)
            .order(definition.order)
            .timeout(definition.timeout_ms.map(Duration::from_millis))
            .build();
        debug!(predicate = %route.predicate(), filters = route.filters().len(), "[Rg.Route] compiled");
        Ok(route)
    }

    /// Compile every definition into one table, stopping at the first failure.
    ///
    /// # Errors
    /// See [`RouteCompiler::compile`].
    pub fn compile_table(&self, definitions: impl IntoIterator<Item = RouteDefinition>) -> Result<RouteTable, GatewayError> {
        let routes = definitions.into_iter().map(|definition| self.compile(&definition)).collect::<Result<Vec<_>, _>>()?;
        Ok(RouteTable::new(routes))
    }
}
