use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use relaygate_kernel::local::LocalDispatcher;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use relaygate_config::model::*;
pub use relaygate_config::service::*;

use crate::server::RunningGateway;

pub struct ListenerWrapper(Box<dyn Listen>);

impl Stream for ListenerWrapper {
    type Item = ListenEvent;

    fn poll_next(mut self: std::pin::Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Option<Self::Item>> {
        self.0.poll_next(cx).map_err(|e| tracing::error!("[Rg.Config] listening config error: {e}")).map(Result::ok)
    }
}

/// Startup the gateway with custom shutdown signal
///
/// Every config event refreshes the route table. A refresh that fails is logged and the routes
/// published before keep serving.
///
/// # Errors
/// If the initial config can't be read or the gateway fails to start.
pub async fn startup_with_shutdown_signal<C>(config: C, local: LocalDispatcher, shutdown_signal: CancellationToken) -> Result<(), BoxError>
where
    C: Retrieve + CreateListener + RouteDefinitionLocator + 'static,
{
    let (init_config, listener) = config.create_listener().await?;
    let config = Arc::new(config);
    let gateway = RunningGateway::create(&init_config, config.clone(), local, shutdown_signal.child_token()).await?;
    let mut listener = ListenerWrapper(Box::new(listener.join(gateway.repository().subscribe())));
    info!("[Rg.Config] Entering listening");

    loop {
        let event = tokio::select! {
            _ = shutdown_signal.cancelled() => {
                info!("[Rg.Config] config listener {CONFIG_LISTENER_NAME} shutdown", CONFIG_LISTENER_NAME = C::CONFIG_LISTENER_NAME);
                gateway.shutdown().await;
                return Ok(());
            }
            event = listener.next() => {
                match event {
                    Some(event) => event,
                    None => {
                        info!("[Rg.Config] config event stream end");
                        gateway.shutdown().await;
                        return Ok(());
                    }
                }
            }
        };

        if let Err(e) = handler(event, config.as_ref(), &init_config, &gateway).await {
            tracing::error!("[Rg.Config] handle event failed: {e}", e = e);
        }
    }
}

async fn handler<C: Retrieve>(event: ListenEvent, config: &C, init_config: &GatewayConfig, gateway: &RunningGateway) -> Result<(), BoxError> {
    match event.config {
        ConfigType::Global => {
            let config = config.retrieve_config().await?;
            if config.server != init_config.server || config.http_client != init_config.http_client {
                tracing::warn!("[Rg.Config] server and client settings are applied on restart only");
            }
            gateway.set_default_filters(config.default_filters);
            info!("[Rg.Config] config reloaded");
        }
        ConfigType::Route { ref id } => {
            info!("[Rg.Config] route {id} {kind}", kind = event.r#type);
        }
    }
    gateway.refresh().await?;
    Ok(())
}
