use std::sync::Arc;

use futures_util::{stream, stream::BoxStream, StreamExt};
use relaygate_model::{BoxError, GatewayConfig, RouteDefinition};

use super::{CreateListener, Listen, ListenEvent, Retrieve, RouteDefinitionLocator};

/// A fixed config held in memory.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    pub config: Arc<GatewayConfig>,
}

impl Memory {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config: Arc::new(config) }
    }
}

impl Retrieve for Memory {
    async fn retrieve_config(&self) -> Result<GatewayConfig, BoxError> {
        Ok(self.config.as_ref().clone())
    }
}

impl RouteDefinitionLocator for Memory {
    fn route_definitions(&self) -> BoxStream<'_, Result<RouteDefinition, BoxError>> {
        stream::iter(self.config.routes.iter().cloned().map(Ok)).boxed()
    }
}

/// Never yields, a memory config doesn't change.
pub struct Static;

impl Listen for Static {
    fn poll_next(&mut self, _cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<ListenEvent, BoxError>> {
        std::task::Poll::Pending
    }
}

impl CreateListener for Memory {
    const CONFIG_LISTENER_NAME: &'static str = "memory";

    async fn create_listener(&self) -> Result<(GatewayConfig, Box<dyn Listen>), BoxError> {
        Ok((self.config.as_ref().clone(), Box::new(Static)))
    }
}
