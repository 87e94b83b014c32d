mod attributes;
pub use attributes::*;

use hyper::{
    header::HeaderMap,
    http::{Extensions, Method},
    Response, StatusCode, Uri,
};
use std::{fmt, net::SocketAddr};

use crate::{RgBody, RgRequest, RgResponse};

/// Snapshot of the inbound request taken before any filter ran.
#[derive(Debug, Clone)]
pub struct OriginalRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// The response being prepared for the downstream client.
///
/// Nothing is sent until the gateway service turns the exchange into a response,
/// `committed` only tells filters that the body has been decided.
#[derive(Debug, Default)]
pub struct ServerResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Option<RgBody>,
    committed: bool,
}

impl ServerResponse {
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
    pub fn set_body(&mut self, body: RgBody) {
        self.body = Some(body);
    }
    pub fn is_committed(&self) -> bool {
        self.committed
    }
    pub fn commit(&mut self) {
        self.committed = true;
    }
    pub fn into_response(self) -> RgResponse {
        let mut response = Response::new(self.body.unwrap_or_default());
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

/// Per request context shared by predicates and filters.
///
/// An exchange lives exactly as long as one request and is owned by the task handling it.
pub struct Exchange {
    request: RgRequest,
    original: OriginalRequest,
    response: ServerResponse,
    attributes: Extensions,
    client_response: Option<RgBody>,
    routed: bool,
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("method", self.request.method())
            .field("uri", self.request.uri())
            .field("original_uri", &self.original.uri)
            .field("routed", &self.routed)
            .field("committed", &self.response.committed)
            .finish_non_exhaustive()
    }
}

impl Exchange {
    pub fn new(request: RgRequest) -> Self {
        let original = OriginalRequest {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
        };
        Self {
            request,
            original,
            response: ServerResponse::default(),
            attributes: Extensions::new(),
            client_response: None,
            routed: false,
        }
    }
    /// The current request, possibly rewritten by filters.
    pub fn request(&self) -> &RgRequest {
        &self.request
    }
    pub fn request_mut(&mut self) -> &mut RgRequest {
        &mut self.request
    }
    /// Take the request body, leaving an empty one behind.
    pub fn take_request_body(&mut self) -> RgBody {
        std::mem::take(self.request.body_mut())
    }
    pub fn original(&self) -> &OriginalRequest {
        &self.original
    }
    pub fn response(&self) -> &ServerResponse {
        &self.response
    }
    pub fn response_mut(&mut self) -> &mut ServerResponse {
        &mut self.response
    }
    pub fn attributes(&self) -> &Extensions {
        &self.attributes
    }
    pub fn attributes_mut(&mut self) -> &mut Extensions {
        &mut self.attributes
    }
    pub fn attribute<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.attributes.get::<T>()
    }
    pub fn insert_attribute<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.attributes.insert(value)
    }
    pub fn remove_attribute<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.attributes.remove::<T>()
    }

    /// Mark this exchange as routed. There is no way to unset it.
    pub fn set_already_routed(&mut self) {
        self.routed = true;
    }
    pub fn is_already_routed(&self) -> bool {
        self.routed
    }

    /// Keep the upstream body until the write back step commits it.
    pub fn stage_client_response(&mut self, body: RgBody) {
        self.client_response = Some(body);
    }
    pub fn take_client_response(&mut self) -> Option<RgBody> {
        self.client_response.take()
    }
    pub fn has_client_response(&self) -> bool {
        self.client_response.is_some()
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.request.extensions().get::<PeerAddr>().map(|peer| peer.0)
    }
    pub fn gateway_request_url(&self) -> Option<&GatewayRequestUrl> {
        self.attributes.get::<GatewayRequestUrl>()
    }
    /// Record a url the request was known by before a rewrite.
    pub fn add_original_request_url(&mut self, uri: Uri) {
        let urls = self.attributes.get_or_insert_default::<OriginalRequestUrls>();
        if !urls.0.contains(&uri) {
            urls.0.push(uri);
        }
    }

    pub fn into_response(self) -> RgResponse {
        self.response.into_response()
    }
}
