//! Proxying requests to `http` and `https` upstreams.
pub mod client;
pub mod forwarder;
pub mod headers;

pub use client::{HttpClient, HyperClient};
pub use forwarder::UpstreamForwarder;
pub use headers::{Direction, HeadersFilters, HttpHeadersFilter, RemoveHopByHopHeadersFilter, XForwardedHeadersFilter};
