use std::time::Duration;

use hyper::{
    header::{self, HeaderValue},
    Request,
};
use tracing::{debug, instrument};

use super::{
    client::HttpClient,
    headers::{Direction, HeadersFilters},
};
use crate::{
    error::GatewayError,
    exchange::{ClientResponseHeaderNames, GatewayRequestUrl, MatchedRoute, OriginalResponseContentType, PreserveHostHeader},
    filter::{Flow, GatewayFilter, Next},
    Exchange, RgRequest, RgResponse,
};

const CHUNKED: &[u8] = b"chunked";

/// Sends the request to an `http` or `https` upstream and stages its response.
///
/// The staged body is committed later by the write back filter, filters in between may still
/// inspect and change status and headers.
#[derive(Debug, Clone)]
pub struct UpstreamForwarder<C> {
    client: C,
    headers: HeadersFilters,
    response_timeout: Option<Duration>,
}

impl<C: HttpClient> UpstreamForwarder<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            headers: HeadersFilters::standard(),
            response_timeout: None,
        }
    }
    #[must_use]
    pub fn with_headers_filters(mut self, headers: HeadersFilters) -> Self {
        self.headers = headers;
        self
    }
    /// Gateway wide response timeout, a route timeout takes precedence.
    #[must_use]
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    fn outbound_request(&self, exchange: &mut Exchange, url: &GatewayRequestUrl) -> Result<RgRequest, GatewayError> {
        let chunked = exchange.request().headers().get_all(header::TRANSFER_ENCODING).iter().any(|value| value.as_bytes().eq_ignore_ascii_case(CHUNKED));
        let mut headers = self.headers.apply(exchange.request().headers().clone(), exchange, Direction::Request);
        let preserve_host = exchange.attribute::<PreserveHostHeader>().is_some_and(|preserve| preserve.0);
        match exchange.original().headers.get(header::HOST) {
            Some(host) if preserve_host => {
                headers.insert(header::HOST, host.clone());
            }
            _ => {
                headers.remove(header::HOST);
            }
        }
        if chunked {
            headers.remove(header::CONTENT_LENGTH);
            headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        }
        let mut request = Request::builder()
            .method(exchange.request().method().clone())
            .uri(url.uri().clone())
            .body(exchange.take_request_body())
            .map_err(GatewayError::internal)?;
        *request.headers_mut() = headers;
        Ok(request)
    }

    fn stage(&self, exchange: &mut Exchange, response: RgResponse) {
        let (parts, body) = response.into_parts();
        if let Some(content_type) = parts.headers.get(header::CONTENT_TYPE) {
            exchange.insert_attribute(OriginalResponseContentType(content_type.clone()));
        }
        exchange.insert_attribute(ClientResponseHeaderNames(parts.headers.keys().cloned().collect()));
        let mut headers = self.headers.apply(parts.headers, exchange, Direction::Response);
        if headers.contains_key(header::CONTENT_LENGTH) {
            headers.remove(header::TRANSFER_ENCODING);
        }
        let server_response = exchange.response_mut();
        server_response.set_status(parts.status);
        server_response.headers_mut().extend(headers);
        exchange.stage_client_response(body);
    }
}

impl<C: HttpClient> GatewayFilter for UpstreamForwarder<C> {
    #[instrument(name = "upstream", skip_all, fields(url = tracing::field::Empty))]
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let Some(url) = exchange.gateway_request_url().cloned() else {
            return Ok(next.proceed());
        };
        if exchange.is_already_routed() || !url.is_http() {
            return Ok(next.proceed());
        }
        exchange.set_already_routed();
        tracing::Span::current().record("url", tracing::field::display(&url));
        let request = self.outbound_request(exchange, &url)?;
        let timeout = exchange.attribute::<MatchedRoute>().and_then(|route| route.timeout()).or(self.response_timeout);
        let response = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.client.request(request)).await.map_err(|_| {
                debug!(?timeout, "[Rg.Upstream] response timeout");
                GatewayError::UpstreamTimeout(timeout)
            })?,
            None => self.client.request(request).await,
        }
        .map_err(GatewayError::Upstream)?;
        debug!(status = %response.status(), "[Rg.Upstream] upstream responded");
        self.stage(exchange, response);
        Ok(next.proceed())
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use hyper::{Response, StatusCode, Uri};

    use super::*;
    use crate::{filter::FilterChain, filter::BoxFilter, filter::OrderedFilter, route::Route, BoxError, RgBody};

    #[derive(Clone, Default)]
    struct FakeClient {
        seen: Arc<Mutex<Vec<hyper::http::request::Parts>>>,
        delay: Option<Duration>,
    }

    impl HttpClient for FakeClient {
        async fn request(&self, req: RgRequest) -> Result<RgResponse, BoxError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let (parts, _body) = req.into_parts();
            self.seen.lock().expect("poisoned").push(parts);
            Ok(Response::builder()
                .status(StatusCode::CREATED)
                .header("content-type", "text/plain")
                .header("content-length", "2")
                .header("transfer-encoding", "chunked")
                .header("x-upstream", "yes")
                .body(RgBody::full("ok"))
                .expect("valid response"))
        }
    }

    fn exchange(url: &str) -> Exchange {
        let request = Request::builder()
            .uri("/a")
            .header("host", "gateway.local")
            .header("transfer-encoding", "chunked")
            .header("content-length", "10")
            .body(RgBody::empty())
            .expect("valid request");
        let mut exchange = Exchange::new(request);
        let uri: Uri = url.parse().expect("valid uri");
        let scheme = uri.scheme_str().unwrap_or("forward").to_string();
        exchange.insert_attribute(GatewayRequestUrl::new(scheme, uri));
        exchange
    }

    async fn run(forwarder: UpstreamForwarder<FakeClient>, exchange: &mut Exchange) -> Result<(), GatewayError> {
        let chain = FilterChain::new(vec![OrderedFilter::new(0, BoxFilter::new("upstream", forwarder))]);
        chain.run(exchange).await.map(|_| ())
    }

    #[tokio::test]
    async fn test_forward_and_stage() {
        let client = FakeClient::default();
        let mut exchange = exchange("http://upstream:8080/a");
        run(UpstreamForwarder::new(client.clone()), &mut exchange).await.expect("forwarded");
        assert!(exchange.is_already_routed());
        assert!(exchange.has_client_response());
        assert!(!exchange.response().is_committed());
        assert_eq!(exchange.response().status(), Some(StatusCode::CREATED));
        let headers = exchange.response().headers();
        assert!(headers.contains_key("x-upstream"));
        assert!(!headers.contains_key(header::TRANSFER_ENCODING));
        assert_eq!(exchange.attribute::<OriginalResponseContentType>().map(|ct| ct.0.as_bytes()), Some(b"text/plain".as_slice()));
        assert_eq!(exchange.attribute::<ClientResponseHeaderNames>().map(|names| names.0.len()), Some(4));

        let seen = client.seen.lock().expect("poisoned");
        let sent = &seen[0];
        assert_eq!(sent.uri, "http://upstream:8080/a");
        assert!(sent.headers.get(header::HOST).is_none());
        assert_eq!(sent.headers.get(header::TRANSFER_ENCODING).map(|v| v.as_bytes()), Some(CHUNKED));
        assert!(sent.headers.get(header::CONTENT_LENGTH).is_none());
    }

    #[tokio::test]
    async fn test_preserve_host() {
        let client = FakeClient::default();
        let mut exchange = exchange("http://upstream:8080/a");
        exchange.insert_attribute(PreserveHostHeader(true));
        run(UpstreamForwarder::new(client.clone()), &mut exchange).await.expect("forwarded");
        let seen = client.seen.lock().expect("poisoned");
        assert_eq!(seen[0].headers.get(header::HOST).map(|v| v.as_bytes()), Some(b"gateway.local".as_slice()));
    }

    #[tokio::test]
    async fn test_skip_routed_or_other_scheme() {
        let client = FakeClient::default();
        let mut routed = exchange("http://upstream:8080/a");
        routed.set_already_routed();
        run(UpstreamForwarder::new(client.clone()), &mut routed).await.expect("skipped");
        let mut forward = exchange("/local");
        run(UpstreamForwarder::new(client.clone()), &mut forward).await.expect("skipped");
        assert!(!forward.is_already_routed());
        assert!(client.seen.lock().expect("poisoned").is_empty());
    }

    #[tokio::test]
    async fn test_second_forwarder_skips_routed_exchange() {
        let client = FakeClient::default();
        let chain = FilterChain::new(vec![
            OrderedFilter::new(0, BoxFilter::new("upstream-a", UpstreamForwarder::new(client.clone()))),
            OrderedFilter::new(1, BoxFilter::new("upstream-b", UpstreamForwarder::new(client.clone()))),
        ]);
        let mut exchange = exchange("http://upstream:8080/a");
        chain.run(&mut exchange).await.expect("forwarded");
        assert!(exchange.is_already_routed());
        assert_eq!(client.seen.lock().expect("poisoned").len(), 1);
    }

    #[tokio::test]
    async fn test_timeout() {
        let client = FakeClient {
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        };
        let forwarder = UpstreamForwarder::new(client.clone()).with_response_timeout(Some(Duration::from_secs(10)));
        let mut exchange = exchange("http://upstream:8080/a");
        let route = Route::builder("slow", "http://upstream:8080".parse().expect("valid uri")).timeout(Some(Duration::from_millis(20))).build();
        exchange.insert_attribute(MatchedRoute(Arc::new(route)));
        let error = run(forwarder, &mut exchange).await.expect_err("timed out");
        assert!(matches!(error, GatewayError::UpstreamTimeout(timeout) if timeout == Duration::from_millis(20)));
        assert_eq!(error.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert!(exchange.is_already_routed());
        assert!(client.seen.lock().expect("poisoned").is_empty());
    }
}
