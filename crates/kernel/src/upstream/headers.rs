use std::{fmt, sync::Arc};

use hyper::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::{utils::HostAndPort, Exchange};

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PORT: HeaderName = HeaderName::from_static("x-forwarded-port");

/// Which way the headers being filtered travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Gateway to upstream.
    Request,
    /// Upstream to gateway.
    Response,
}

/// A step rewriting the header set exchanged with the upstream.
pub trait HttpHeadersFilter: Send + Sync + 'static {
    fn filter(&self, headers: HeaderMap, exchange: &Exchange) -> HeaderMap;
    fn supports(&self, direction: Direction) -> bool {
        direction == Direction::Request
    }
}

/// Header filters applied in registration order.
#[derive(Clone, Default)]
pub struct HeadersFilters {
    filters: Vec<Arc<dyn HttpHeadersFilter>>,
}

impl fmt::Debug for HeadersFilters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadersFilters").field("len", &self.filters.len()).finish()
    }
}

impl HeadersFilters {
    pub fn new() -> Self {
        Self::default()
    }
    /// Hop-by-hop removal followed by `X-Forwarded-*`.
    pub fn standard() -> Self {
        Self::new().with(RemoveHopByHopHeadersFilter::default()).with(XForwardedHeadersFilter)
    }
    #[must_use]
    pub fn with(mut self, filter: impl HttpHeadersFilter) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }
    pub fn apply(&self, mut headers: HeaderMap, exchange: &Exchange, direction: Direction) -> HeaderMap {
        for filter in self.filters.iter().filter(|filter| filter.supports(direction)) {
            headers = filter.filter(headers, exchange);
        }
        headers
    }
}

/// Remove headers meaningful for a single connection only.
#[derive(Debug, Clone)]
pub struct RemoveHopByHopHeadersFilter {
    headers: Vec<HeaderName>,
}

impl Default for RemoveHopByHopHeadersFilter {
    fn default() -> Self {
        Self {
            headers: vec![
                header::CONNECTION,
                HeaderName::from_static("keep-alive"),
                header::TRANSFER_ENCODING,
                header::TE,
                header::TRAILER,
                header::PROXY_AUTHORIZATION,
                header::PROXY_AUTHENTICATE,
                HeaderName::from_static("x-application-context"),
                header::UPGRADE,
            ],
        }
    }
}

impl RemoveHopByHopHeadersFilter {
    pub fn new(headers: Vec<HeaderName>) -> Self {
        Self { headers }
    }
}

impl HttpHeadersFilter for RemoveHopByHopHeadersFilter {
    fn filter(&self, mut headers: HeaderMap, _exchange: &Exchange) -> HeaderMap {
        // names listed in `Connection` are hop by hop too
        let listed: Vec<HeaderName> = headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','))
            .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
            .collect();
        for name in self.headers.iter().chain(listed.iter()) {
            headers.remove(name);
        }
        headers
    }
    fn supports(&self, _direction: Direction) -> bool {
        true
    }
}

/// Tell the upstream who called the gateway and how.
#[derive(Debug, Clone, Copy, Default)]
pub struct XForwardedHeadersFilter;

impl HttpHeadersFilter for XForwardedHeadersFilter {
    fn filter(&self, mut headers: HeaderMap, exchange: &Exchange) -> HeaderMap {
        let original = exchange.original();
        if let Some(peer) = exchange.peer_addr() {
            if let Ok(ip) = HeaderValue::from_str(&peer.ip().to_string()) {
                let forwarded_for = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
                    Some(existing) => HeaderValue::from_str(&format!("{existing}, {}", peer.ip())).unwrap_or(ip),
                    None => ip,
                };
                headers.insert(X_FORWARDED_FOR, forwarded_for);
            }
        }
        let proto = original.uri.scheme_str().unwrap_or("http");
        if !headers.contains_key(X_FORWARDED_PROTO) {
            if let Ok(proto) = HeaderValue::from_str(proto) {
                headers.insert(X_FORWARDED_PROTO, proto);
            }
        }
        if let Some(host) = original.headers.get(header::HOST) {
            if !headers.contains_key(X_FORWARDED_HOST) {
                headers.insert(X_FORWARDED_HOST, host.clone());
            }
            if !headers.contains_key(X_FORWARDED_PORT) {
                let port = host
                    .to_str()
                    .ok()
                    .and_then(|host| HostAndPort::parse(host).port)
                    .or_else(|| crate::utils::scheme_to_port(proto));
                if let Some(port) = port {
                    headers.insert(X_FORWARDED_PORT, HeaderValue::from(port));
                }
            }
        }
        headers
    }
}
