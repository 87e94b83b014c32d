use std::{
    net::SocketAddr,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use futures_util::TryStreamExt;
use relaygate_config::service::{CompositeLocator, InMemoryRouteDefinitionRepository, RouteDefinitionLocator};
use relaygate_kernel::{
    dispatcher::{FilteringHandler, RouteDispatcher},
    exchange::GatewayName,
    global_filter::standard_global_filters,
    listener::RgListen,
    local::LocalDispatcher,
    route::{RouteLocator, RouteTable},
    service::GatewayService,
    upstream::{HyperClient, UpstreamForwarder},
    BoxError, GatewayError,
};
use relaygate_model::{FilterDefinition, GatewayConfig, RouteDefinition};
use relaygate_plugin::RouteCompiler;
use tokio::{net::TcpListener, time::timeout};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Read every definition from `definitions` and compile them into one table.
///
/// # Errors
/// The first locator error, or the first definition that fails to compile.
pub async fn load_table(definitions: &dyn RouteDefinitionLocator, compiler: &RouteCompiler) -> Result<RouteTable, GatewayError> {
    let definitions: Vec<RouteDefinition> = definitions.route_definitions().try_collect().await.map_err(GatewayError::internal)?;
    compiler.compile_table(definitions)
}

/// # Gateway
/// A running relaygate gateway instance
///
/// It's created by calling [create](RunningGateway::create), and serves until
/// [shutdown](RunningGateway::shutdown) is called or its cancel token is cancelled.
pub struct RunningGateway {
    pub name: GatewayName,
    pub local_addr: SocketAddr,
    compiler: RwLock<RouteCompiler>,
    definitions: CompositeLocator,
    repository: Arc<InMemoryRouteDefinitionRepository>,
    routes: Arc<RouteLocator>,
    token: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for RunningGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningGateway").field("name", &self.name).field("local_addr", &self.local_addr).finish_non_exhaustive()
    }
}

impl RunningGateway {
    /// Build the route table, bind the server address and start serving.
    ///
    /// Routes come from `source` followed by the routes saved to the [repository](RunningGateway::repository).
    ///
    /// # Errors
    /// If the initial route table can't be built or the address can't be bound.
    #[instrument(fields(gateway = %config.server.name), skip_all, err)]
    pub async fn create(config: &GatewayConfig, source: Arc<dyn RouteDefinitionLocator>, local: LocalDispatcher, cancel_token: CancellationToken) -> Result<Self, BoxError> {
        tracing::info!("[Rg.Server] start gateway");
        let compiler = RouteCompiler::default().with_default_filters(config.default_filters.iter().cloned());
        let repository = Arc::new(InMemoryRouteDefinitionRepository::new());
        let saved: Arc<dyn RouteDefinitionLocator> = repository.clone();
        let definitions = CompositeLocator::new(vec![source, saved]);
        let table = load_table(&definitions, &compiler).await?;
        let routes = Arc::new(RouteLocator::new(table));

        let forwarder = UpstreamForwarder::new(HyperClient::new(&config.http_client)).with_response_timeout(config.http_client.response_timeout());
        let handler = Arc::new(FilteringHandler::new(standard_global_filters(forwarder, local)));
        let name = GatewayName::new(config.server.name.as_str());
        let service = GatewayService::new(name.clone(), RouteDispatcher::new(routes.clone(), handler));

        let listener = TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
        let local_addr = listener.local_addr()?;
        let listen = RgListen::new(local_addr, service, cancel_token.child_token());
        let handle = {
            let name = name.clone();
            tokio::spawn(async move {
                if let Err(e) = listen.serve(listener).await {
                    tracing::error!("[Rg.Server] listen error: {e}")
                }
                tracing::info!(gateway = &*name, "[Rg.Server] quit listening");
            })
        };
        tracing::info!(%local_addr, "[Rg.Server] start finished");
        Ok(Self {
            name,
            local_addr,
            compiler: RwLock::new(compiler),
            definitions,
            repository,
            routes,
            token: cancel_token,
            handle,
            shutdown_timeout: Duration::from_secs(10),
        })
    }

    /// Routes saved here are served after the routes of the config source.
    pub fn repository(&self) -> &Arc<InMemoryRouteDefinitionRepository> {
        &self.repository
    }

    pub fn routes(&self) -> &Arc<RouteLocator> {
        &self.routes
    }

    /// Replace the filters put in front of every route, taking effect on the next refresh.
    pub fn set_default_filters(&self, default_filters: Vec<FilterDefinition>) {
        let mut compiler = self.compiler.write().unwrap_or_else(PoisonError::into_inner);
        *compiler = compiler.clone().with_default_filters(default_filters);
    }

    /// Reload every definition and publish the new table.
    ///
    /// # Errors
    /// If loading or compiling fails, in which case the previous table keeps serving.
    pub async fn refresh(&self) -> Result<(), GatewayError> {
        let compiler = self.compiler.read().unwrap_or_else(PoisonError::into_inner).clone();
        self.routes.refresh(|| load_table(&self.definitions, &compiler)).await
    }

    /// Shutdown this gateway
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = timeout(self.shutdown_timeout, self.handle).await {
            tracing::warn!("[Rg.Server] Wait shutdown timeout:{e}");
        }
        tracing::info!(gateway = &*self.name, "[Rg.Server] Gateway shutdown");
    }
}
