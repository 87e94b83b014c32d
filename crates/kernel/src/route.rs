use std::{fmt, future::Future, str::FromStr, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use hyper::{
    http::uri::{Authority, PathAndQuery},
    Uri,
};
use relaygate_model::constants::{SCHEME_FORWARD, SCHEME_HTTP, SCHEME_HTTPS};
use tracing::{info, warn};

use crate::{error::GatewayError, exchange::GatewayRequestUrl, filter::OrderedFilter, predicate::Predicate, BoxError};

/// The target of a route.
///
/// Only scheme and authority are kept, the path sent upstream is the (possibly rewritten)
/// request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteUri {
    raw: Arc<str>,
    scheme: Arc<str>,
    authority: Option<Authority>,
}

impl RouteUri {
    pub fn scheme(&self) -> &str {
        &self.scheme
    }
    pub fn authority(&self) -> Option<&Authority> {
        self.authority.as_ref()
    }
    pub fn is_forward(&self) -> bool {
        self.scheme.eq_ignore_ascii_case(SCHEME_FORWARD)
    }

    /// Combine this target with the path and query of `request`.
    ///
    /// # Errors
    /// If the merged uri is not valid.
    pub fn merge(&self, request: &Uri) -> Result<GatewayRequestUrl, BoxError> {
        let path_and_query = request.path_and_query().cloned().unwrap_or_else(|| PathAndQuery::from_static("/"));
        let uri = match &self.authority {
            Some(authority) => Uri::builder().scheme(self.scheme.as_ref()).authority(authority.clone()).path_and_query(path_and_query).build()?,
            None => Uri::from(path_and_query),
        };
        Ok(GatewayRequestUrl::new(self.scheme.clone(), uri))
    }
}

impl FromStr for RouteUri {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = s.split_once(':').ok_or("missing scheme")?;
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
            return Err(format!("invalid scheme `{scheme}`").into());
        }
        let authority = match rest.strip_prefix("//") {
            Some(rest) => {
                let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
                if authority.is_empty() {
                    None
                } else {
                    Some(authority.parse::<Authority>()?)
                }
            }
            None => None,
        };
        let is_http = scheme.eq_ignore_ascii_case(SCHEME_HTTP) || scheme.eq_ignore_ascii_case(SCHEME_HTTPS);
        if is_http && authority.is_none() {
            return Err(format!("`{scheme}` uri requires a host").into());
        }
        Ok(Self {
            raw: s.into(),
            scheme: scheme.to_ascii_lowercase().into(),
            authority,
        })
    }
}

impl fmt::Display for RouteUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A compiled route. Never mutated once built, a changed definition produces a new route.
#[derive(Debug)]
pub struct Route {
    id: Arc<str>,
    uri: RouteUri,
    predicate: Predicate,
    filters: Arc<[OrderedFilter]>,
    order: i32,
    timeout: Option<Duration>,
}

impl Route {
    pub fn builder(id: impl Into<Arc<str>>, uri: RouteUri) -> RouteBuilder {
        RouteBuilder {
            id: id.into(),
            uri,
            predicate: Predicate::always(),
            filters: Vec::new(),
            order: 0,
            timeout: None,
        }
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn shared_id(&self) -> Arc<str> {
        self.id.clone()
    }
    pub fn uri(&self) -> &RouteUri {
        &self.uri
    }
    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
    /// Route filters, sorted by order.
    pub fn filters(&self) -> &[OrderedFilter] {
        &self.filters
    }
    pub fn order(&self) -> i32 {
        self.order
    }
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[derive(Debug)]
pub struct RouteBuilder {
    id: Arc<str>,
    uri: RouteUri,
    predicate: Predicate,
    filters: Vec<OrderedFilter>,
    order: i32,
    timeout: Option<Duration>,
}

impl RouteBuilder {
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = predicate;
        self
    }
    pub fn filters(mut self, filters: impl IntoIterator<Item = OrderedFilter>) -> Self {
        self.filters.extend(filters);
        self
    }
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn build(mut self) -> Route {
        self.filters.sort_by_key(|filter| filter.order);
        Route {
            id: self.id,
            uri: self.uri,
            predicate: self.predicate,
            filters: self.filters.into(),
            order: self.order,
            timeout: self.timeout,
        }
    }
}

/// Routes in match order: ascending `order`, ties keep their source order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Arc<[Arc<Route>]>,
}

impl RouteTable {
    pub fn new(routes: impl IntoIterator<Item = Route>) -> Self {
        let mut routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        routes.sort_by_key(|route| route.order);
        Self { routes: routes.into() }
    }
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.iter()
    }
    pub fn len(&self) -> usize {
        self.routes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
    /// First route with the given id.
    pub fn get(&self, id: &str) -> Option<&Arc<Route>> {
        self.routes.iter().find(|route| route.id() == id)
    }
}

/// Holds the published route table.
///
/// Readers take a snapshot and never observe a table that is half built.
#[derive(Debug, Default)]
pub struct RouteLocator {
    table: ArcSwap<RouteTable>,
}

impl RouteLocator {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table: ArcSwap::from_pointee(table),
        }
    }
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }
    pub fn publish(&self, table: RouteTable) {
        info!(routes = table.len(), "[Rg.Route] publish route table");
        self.table.store(Arc::new(table));
    }
    /// Rebuild the table with `build` and publish it.
    ///
    /// # Errors
    /// If building fails, the table published before stays in place.
    pub async fn refresh<F, Fut>(&self, build: F) -> Result<(), GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RouteTable, GatewayError>>,
    {
        match build().await {
            Ok(table) => {
                self.publish(table);
                Ok(())
            }
            Err(e) => {
                warn!("[Rg.Route] refresh failed, keep the previous table: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn route(id: &str, order: i32) -> Route {
        Route::builder(id, "http://localhost:8080".parse().expect("valid uri")).order(order).build()
    }

    fn ids(table: &RouteTable) -> Vec<&str> {
        table.iter().map(|route| route.id()).collect()
    }

    #[test]
    fn test_route_uri() {
        let uri: RouteUri = "http://example.org:8080/ignored".parse().expect("valid uri");
        assert_eq!(uri.scheme(), "http");
        assert_eq!(uri.authority().map(Authority::as_str), Some("example.org:8080"));
        let merged = uri.merge(&Uri::from_static("http://gateway/a/b?x=1")).expect("valid merge");
        assert_eq!(merged.uri(), "http://example.org:8080/a/b?x=1");

        let forward: RouteUri = "forward:///local".parse().expect("valid uri");
        assert!(forward.is_forward());
        assert!(forward.authority().is_none());
        let merged = forward.merge(&Uri::from_static("/health?full")).expect("valid merge");
        assert_eq!(merged.scheme(), "forward");
        assert_eq!(merged.to_string(), "forward:/health?full");

        assert!("http:///no-host".parse::<RouteUri>().is_err());
        assert!("no-scheme".parse::<RouteUri>().is_err());
    }

    #[test]
    fn test_table_stable_order() {
        let table = RouteTable::new([route("a", 2), route("b", 1), route("c", 2), route("d", 1)]);
        assert_eq!(ids(&table), ["b", "d", "a", "c"]);
        assert_eq!(table.get("c").map(|route| route.order()), Some(2));
    }

    #[tokio::test]
    async fn test_refresh_keeps_previous_table() {
        let locator = RouteLocator::new(RouteTable::new([route("a", 0)]));
        let result = locator
            .refresh(|| async {
                Err(GatewayError::UnknownPredicate {
                    route: "b".into(),
                    name: "nope".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(ids(&locator.snapshot()), ["a"]);

        locator.refresh(|| async { Ok(RouteTable::new([route("b", 0)])) }).await.expect("refresh succeeds");
        assert_eq!(ids(&locator.snapshot()), ["b"]);
    }
}
