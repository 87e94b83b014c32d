use std::convert::Infallible;

use futures_util::future::BoxFuture;
use hyper::{Response, StatusCode};
use tracing::instrument;

use crate::{
    dispatcher::{Dispatched, RouteDispatcher},
    exchange::GatewayName,
    Exchange, RgBody, RgRequest, RgResponse, RgResponseExt,
};

/// The gateway as a hyper service: dispatch, then turn the exchange into a response.
#[derive(Debug, Clone)]
pub struct GatewayService {
    name: GatewayName,
    dispatcher: RouteDispatcher,
}

impl GatewayService {
    pub fn new(name: GatewayName, dispatcher: RouteDispatcher) -> Self {
        Self { name, dispatcher }
    }
    pub fn dispatcher(&self) -> &RouteDispatcher {
        &self.dispatcher
    }

    #[instrument(name = "gateway", skip_all, fields(gateway = &*self.name))]
    pub async fn handle(&self, mut req: RgRequest) -> RgResponse {
        req.extensions_mut().insert(self.name.clone());
        let mut exchange = Exchange::new(req);
        match self.dispatcher.dispatch(&mut exchange).await {
            Ok(Dispatched::Routed { .. }) => exchange.into_response(),
            Ok(Dispatched::NoRoute) => Response::<RgBody>::with_code_message(StatusCode::NOT_FOUND, "[Rg.Dispatcher] no route matched"),
            Err(e) => e.to_response(),
        }
    }
}

impl hyper::service::Service<RgRequest> for GatewayService {
    type Response = RgResponse;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn call(&self, req: RgRequest) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}
