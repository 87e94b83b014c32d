use std::{fmt, net::SocketAddr, ops::Deref, sync::Arc};

use hyper::{
    header::{HeaderName, HeaderValue},
    Uri,
};
use relaygate_model::constants::{SCHEME_HTTP, SCHEME_HTTPS};

use crate::route::Route;

/// The route selected for this request.
#[derive(Debug, Clone)]
pub struct MatchedRoute(pub Arc<Route>);

impl Deref for MatchedRoute {
    type Target = Route;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Id of the route selected for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteId(pub Arc<str>);

/// Id of the route whose predicate is being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateRouteAttempt(pub Arc<str>);

/// The url the request will be sent to.
///
/// `forward` urls keep only the path and query, the scheme says where to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequestUrl {
    scheme: Arc<str>,
    uri: Uri,
}

impl GatewayRequestUrl {
    pub fn new(scheme: impl Into<Arc<str>>, uri: Uri) -> Self {
        Self { scheme: scheme.into(), uri }
    }
    pub fn scheme(&self) -> &str {
        &self.scheme
    }
    pub fn uri(&self) -> &Uri {
        &self.uri
    }
    pub fn is_http(&self) -> bool {
        self.scheme.eq_ignore_ascii_case(SCHEME_HTTP) || self.scheme.eq_ignore_ascii_case(SCHEME_HTTPS)
    }
}

impl fmt::Display for GatewayRequestUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.scheme().is_some() {
            write!(f, "{}", self.uri)
        } else {
            write!(f, "{}:{}", self.scheme, self.uri)
        }
    }
}

/// Every url the request had before it was rewritten, oldest first.
#[derive(Debug, Clone, Default)]
pub struct OriginalRequestUrls(pub Vec<Uri>);

/// Send the inbound `Host` header to the upstream unchanged.
#[derive(Debug, Clone, Copy)]
pub struct PreserveHostHeader(pub bool);

#[derive(Debug, Clone)]
pub struct OriginalResponseContentType(pub HeaderValue);

/// Header names as the upstream sent them, before response header filters ran.
#[derive(Debug, Clone, Default)]
pub struct ClientResponseHeaderNames(pub Vec<HeaderName>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PeerAddr(pub SocketAddr);

#[derive(Debug, Clone)]
pub struct GatewayName(pub Arc<str>);

impl GatewayName {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }
}

impl Deref for GatewayName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
