//! Filters applied to every route.
mod forward_routing;
pub use forward_routing::*;
mod route_to_url;
pub use route_to_url::*;
mod write_response;
pub use write_response::*;

use crate::{
    filter::{order, BoxFilter, OrderedFilter},
    local::LocalDispatcher,
    upstream::{HttpClient, UpstreamForwarder},
};

/// The global filters every gateway needs: write back, url resolution, upstream proxy and local
/// forward.
pub fn standard_global_filters<C: HttpClient>(forwarder: UpstreamForwarder<C>, local: LocalDispatcher) -> Vec<OrderedFilter> {
    vec![
        BoxFilter::new("write-response", WriteResponseFilter).ordered_or(order::WRITE_RESPONSE),
        BoxFilter::new("route-to-request-url", RouteToRequestUrlFilter).ordered_or(order::ROUTE_TO_URL),
        BoxFilter::new("upstream-forwarder", forwarder).ordered_or(order::UPSTREAM_FORWARDER),
        BoxFilter::new("forward-routing", ForwardRoutingFilter::new(local)).ordered_or(order::FORWARD_ROUTING),
    ]
}
