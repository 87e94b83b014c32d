//! **A predicate-routed, filter-chain API gateway**
//!
//! The shell wires the crates together: it reads the gateway config, compiles the route
//! definitions with the factories of [`relaygate_plugin`], serves http, and rebuilds the route
//! table whenever the config source reports a change.
//!
//! ## Route priority
//! Every route carries an integer `order`, lower values are tried first. Routes with the same
//! order keep the order in which their sources list them: the config source first, then the routes
//! saved to the in-memory repository at runtime.
//!
//! Note: Trace-level logs print every filter step of every request. It is recommended to use
//! debug level logs at most.
//!
//! ## startup
//! ### static config
//! see [`startup_static`]
//! ### by config file
//! see [`startup_file`]
#![warn(clippy::unwrap_used)]

pub use hyper;
pub use relaygate_config::model;
pub use relaygate_config::model::{BoxError, BoxResult};
use relaygate_config::service::{CreateListener, Retrieve, RouteDefinitionLocator};
use relaygate_config::GatewayConfig;
pub use relaygate_kernel as kernel;
use relaygate_kernel::local::LocalDispatcher;
pub use relaygate_plugin as plugin;
use tracing::{info, instrument};

pub mod config;
pub mod server;

#[cfg(feature = "fs")]
/// # Startup the gateway by config file
/// The format follows the file extension: `.json` files are read as json, anything else as toml.
///
/// The file is watched, and the routes are rebuilt every time it changes.
///
/// # Errors
/// See [`startup`].
pub async fn startup_file(path: impl AsRef<std::path::Path>, local: LocalDispatcher) -> Result<(), BoxError> {
    use relaygate_config::service::{
        config_format::{Json, Toml},
        fs::Fs,
    };
    let path = path.as_ref();
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        startup(Fs::new(path, Json::default()), local).await
    } else {
        startup(Fs::new(path, Toml::default()), local).await
    }
}

/// # Startup the gateway by static config
/// The `config` is the static config.
///
/// # Errors
/// See [`startup`].
pub async fn startup_static(config: GatewayConfig, local: LocalDispatcher) -> Result<(), BoxError> {
    use relaygate_config::service::memory::Memory;
    startup(Memory::new(config), local).await
}

/// # Startup the gateway
/// The `config` could be any type that implements [`CreateListener`], [`Retrieve`] and
/// [`RouteDefinitionLocator`]. `local` serves the routes with a `forward:` uri.
///
/// Runs until ctrl+c is received.
///
/// # Errors
/// If the config can't be read, a route definition is invalid, or the server address can't be bound.
#[instrument(fields(listener = (L::CONFIG_LISTENER_NAME)), skip_all)]
pub async fn startup<L>(config: L, local: LocalDispatcher) -> Result<(), BoxError>
where
    L: CreateListener + Retrieve + RouteDefinitionLocator + 'static,
{
    info!("Relaygate Meta Info: {:?}", Meta::new());
    info!("Starting gateway...");
    config::startup_with_shutdown_signal(config, local, ctrl_c_cancel_token()).await
}

#[derive(Debug, Clone, Copy)]
pub struct Meta {
    pub version: &'static str,
}

impl Meta {
    const DEFAULT: Meta = Self {
        version: env!("CARGO_PKG_VERSION"),
    };
    pub const fn new() -> Self {
        Self::DEFAULT
    }
}

impl Default for Meta {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A token cancelled on ctrl+c.
pub fn ctrl_c_cancel_token() -> tokio_util::sync::CancellationToken {
    let cancel_token = tokio_util::sync::CancellationToken::new();
    {
        let cancel_token = cancel_token.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received ctrl+c signal, shutting down...");
            cancel_token.cancel();
        });
    }
    cancel_token
}
