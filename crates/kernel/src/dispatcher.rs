use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{debug, error, instrument, trace};

use crate::{
    error::GatewayError,
    exchange::{MatchedRoute, PredicateRouteAttempt, RouteId},
    filter::{merge_and_sort, ChainOutcome, FilterChain, OrderedFilter},
    route::{Route, RouteLocator},
    Exchange,
};

/// Result of dispatching one request.
#[derive(Debug, Clone)]
pub enum Dispatched {
    Routed { route: Arc<Route>, outcome: ChainOutcome },
    NoRoute,
}

/// Runs the filters of a matched route together with the global filters.
#[derive(Debug, Default)]
pub struct FilteringHandler {
    global: ArcSwap<Vec<OrderedFilter>>,
}

impl FilteringHandler {
    pub fn new(global: Vec<OrderedFilter>) -> Self {
        Self {
            global: ArcSwap::from_pointee(global),
        }
    }
    pub fn global_filters(&self) -> Arc<Vec<OrderedFilter>> {
        self.global.load_full()
    }
    pub fn set_global_filters(&self, global: Vec<OrderedFilter>) {
        self.global.store(Arc::new(global));
    }
    /// Build the chain of `route`, against the global filters published right now.
    pub fn chain_for(&self, route: &Route) -> FilterChain {
        FilterChain::new(merge_and_sort(&self.global.load(), route.filters()))
    }
    /// # Errors
    /// The first error raised by the chain.
    pub async fn handle(&self, route: &Route, exchange: &mut Exchange) -> Result<ChainOutcome, GatewayError> {
        let chain = self.chain_for(route);
        trace!(route = route.id(), filters = ?chain.filters().iter().map(OrderedFilter::name).collect::<Vec<_>>(), "[Rg.Dispatcher] sorted filters");
        chain.run(exchange).await
    }
}

/// Picks the route of a request and hands it to the [`FilteringHandler`].
#[derive(Debug, Clone)]
pub struct RouteDispatcher {
    routes: Arc<RouteLocator>,
    handler: Arc<FilteringHandler>,
}

impl RouteDispatcher {
    pub fn new(routes: Arc<RouteLocator>, handler: Arc<FilteringHandler>) -> Self {
        Self { routes, handler }
    }
    pub fn routes(&self) -> &Arc<RouteLocator> {
        &self.routes
    }
    pub fn handler(&self) -> &Arc<FilteringHandler> {
        &self.handler
    }

    /// Find the first route, in table order, whose predicate holds.
    ///
    /// A failing predicate is logged and counts as no match.
    pub async fn lookup_route(&self, exchange: &mut Exchange) -> Option<Arc<Route>> {
        let table = self.routes.snapshot();
        let mut matched = None;
        for route in table.iter() {
            exchange.insert_attribute(PredicateRouteAttempt(route.shared_id()));
            match route.predicate().test(exchange).await {
                Ok(true) => {
                    matched = Some(route.clone());
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(route = route.id(), "[Rg.Dispatcher] error applying predicate {}: {e}", route.predicate());
                }
            }
        }
        exchange.remove_attribute::<PredicateRouteAttempt>();
        matched
    }

    /// Route `exchange` and run the filter chain of the matched route.
    ///
    /// # Errors
    /// Errors of the filter chain. Not finding a route is reported as [`Dispatched::NoRoute`].
    #[instrument(skip_all, fields(method = %exchange.request().method(), path = exchange.request().uri().path()))]
    pub async fn dispatch(&self, exchange: &mut Exchange) -> Result<Dispatched, GatewayError> {
        let Some(route) = self.lookup_route(exchange).await else {
            debug!("[Rg.Dispatcher] no route matched");
            return Ok(Dispatched::NoRoute);
        };
        debug!(route = route.id(), uri = %route.uri(), "[Rg.Dispatcher] route matched");
        exchange.insert_attribute(RouteId(route.shared_id()));
        exchange.insert_attribute(MatchedRoute(route.clone()));
        let outcome = self.handler.handle(&route, exchange).await.inspect_err(|e| {
            if e.status_code().is_server_error() {
                error!(route = route.id(), "[Rg.Dispatcher] filter chain failed: {e}");
            } else {
                debug!(route = route.id(), "[Rg.Dispatcher] filter chain stopped: {e}");
            }
        })?;
        Ok(Dispatched::Routed { route, outcome })
    }
}
