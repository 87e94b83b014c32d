use hyper::Request;
use tracing::debug;

use crate::{
    error::GatewayError,
    filter::{Flow, GatewayFilter, Next},
    local::LocalDispatcher,
    Exchange,
};

/// Serves `forward:` routes with the gateway's own handlers.
///
/// The chain ends here, the local response is committed straight away.
#[derive(Debug, Clone, Default)]
pub struct ForwardRoutingFilter {
    local: LocalDispatcher,
}

impl ForwardRoutingFilter {
    pub fn new(local: LocalDispatcher) -> Self {
        Self { local }
    }
}

impl GatewayFilter for ForwardRoutingFilter {
    async fn filter(&self, exchange: &mut Exchange, next: Next) -> Result<Flow, GatewayError> {
        let Some(url) = exchange.gateway_request_url().cloned() else {
            return Ok(next.proceed());
        };
        if exchange.is_already_routed() || !url.scheme().eq_ignore_ascii_case(relaygate_model::constants::SCHEME_FORWARD) {
            return Ok(next.proceed());
        }
        exchange.set_already_routed();
        debug!(%url, "[Rg.Forward] forward to local handler");
        let mut request = Request::builder()
            .method(exchange.request().method().clone())
            .uri(url.uri().clone())
            .body(exchange.take_request_body())
            .map_err(GatewayError::internal)?;
        *request.headers_mut() = exchange.request().headers().clone();
        let response = self.local.dispatch(request).await.map_err(GatewayError::Internal)?;
        let (parts, body) = response.into_parts();
        let server_response = exchange.response_mut();
        server_response.set_status(parts.status);
        server_response.headers_mut().extend(parts.headers);
        server_response.set_body(body);
        server_response.commit();
        Ok(Flow::complete())
    }
}
