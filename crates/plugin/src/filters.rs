//! Built in filter factories.
pub mod header;
#[cfg(feature = "rewrite")]
pub mod path;
pub mod preserve_host;
#[cfg(feature = "redirect")]
pub mod redirect_to;
#[cfg(feature = "rewrite")]
pub mod rewrite_path;
pub mod set_status;

#[cfg(feature = "rewrite")]
use hyper::{http::uri::PathAndQuery, Uri};
#[cfg(feature = "rewrite")]
use relaygate_kernel::{Exchange, GatewayError};

/// Replace the path of the current request, keeping its query.
///
/// The url before the change is recorded as an original request url.
#[cfg(feature = "rewrite")]
pub(crate) fn rewrite_request_path(exchange: &mut Exchange, path: &str) -> Result<(), GatewayError> {
    let uri = exchange.request().uri().clone();
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).map_err(GatewayError::internal)?);
    let rewritten = Uri::from_parts(parts).map_err(GatewayError::internal)?;
    exchange.add_original_request_url(uri);
    *exchange.request_mut().uri_mut() = rewritten;
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_util {
    use hyper::Request;
    use relaygate_kernel::{
        filter::{BoxFilter, FilterChain, Flow, FnFilter, Next, OrderedFilter},
        Exchange, GatewayError, RgBody,
    };

    use crate::{FactoryRegistry, FilterDefinition};

    pub fn filter(shorthand: &str) -> BoxFilter {
        let definition: FilterDefinition = shorthand.parse().expect("valid shorthand");
        FactoryRegistry::global().filter("test", &definition).expect("filter builds")
    }

    pub fn builds(shorthand: &str) -> bool {
        let definition: FilterDefinition = shorthand.parse().expect("valid shorthand");
        FactoryRegistry::global().filter("test", &definition).is_ok()
    }

    /// Run the filter then a stand in upstream that answers `200` with an `x-upstream` header.
    pub async fn run(shorthand: &str, request: Request<()>) -> Exchange {
        let mut exchange = Exchange::new(request.map(|_| RgBody::empty()));
        let upstream = BoxFilter::new(
            "upstream",
            FnFilter(|exchange: &mut Exchange, next: Next| -> Result<Flow, GatewayError> {
                exchange.set_already_routed();
                exchange.response_mut().set_status(hyper::StatusCode::OK);
                exchange.response_mut().headers_mut().insert("x-upstream", hyper::header::HeaderValue::from_static("1"));
                Ok(next.proceed())
            }),
        );
        let chain = FilterChain::new(vec![OrderedFilter::new(1, filter(shorthand)), OrderedFilter::new(2, upstream)]);
        chain.run(&mut exchange).await.expect("chain succeeds");
        exchange
    }
}
