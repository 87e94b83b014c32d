use tracing::trace;

use crate::{
    error::GatewayError,
    exchange::MatchedRoute,
    filter::{Flow, GatewayFilter, Next},
    Exchange,
};

/// Resolves the url the request is sent to from the matched route and the current request path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteToRequestUrlFilter;

impl GatewayFilter for RouteToRequestUrlFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let Some(route) = exchange.attribute::<MatchedRoute>().cloned() else {
            return Ok(next.proceed());
        };
        let url = route.uri().merge(exchange.request().uri()).map_err(GatewayError::internal)?;
        trace!(route = route.id(), %url, "[Rg.RouteToUrl] resolved request url");
        exchange.insert_attribute(url);
        Ok(next.proceed())
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use hyper::Request;

    use super::*;
    use crate::{
        filter::{BoxFilter, FilterChain, OrderedFilter},
        route::Route,
        RgBody,
    };

    async fn resolve(route_uri: &str, request_uri: &str) -> Exchange {
        let route = Route::builder("r", route_uri.parse().expect("valid uri")).build();
        let mut exchange = Exchange::new(Request::builder().uri(request_uri).body(RgBody::empty()).expect("valid request"));
        exchange.insert_attribute(MatchedRoute(Arc::new(route)));
        let chain = FilterChain::new(vec![OrderedFilter::new(10000, BoxFilter::new("route-to-request-url", RouteToRequestUrlFilter))]);
        chain.run(&mut exchange).await.expect("chain succeeds");
        exchange
    }

    #[tokio::test]
    async fn test_merge_http() {
        let exchange = resolve("https://upstream.internal:8443", "/api/users?page=2").await;
        let url = exchange.gateway_request_url().expect("url resolved");
        assert!(url.is_http());
        assert_eq!(url.uri(), "https://upstream.internal:8443/api/users?page=2");
    }

    #[tokio::test]
    async fn test_merge_forward() {
        let exchange = resolve("forward:///ignored", "/local/health").await;
        let url = exchange.gateway_request_url().expect("url resolved");
        assert!(!url.is_http());
        assert_eq!(url.to_string(), "forward:/local/health");
    }

    #[tokio::test]
    async fn test_without_route() {
        let mut exchange = Exchange::new(Request::new(RgBody::empty()));
        let chain = FilterChain::new(vec![OrderedFilter::new(10000, BoxFilter::new("route-to-request-url", RouteToRequestUrlFilter))]);
        chain.run(&mut exchange).await.expect("chain succeeds");
        assert!(exchange.gateway_request_url().is_none());
    }
}
