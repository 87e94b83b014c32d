use clap::Parser;
use relaygate_shell::{
    config::{
        config_format::{ConfigFormat, Json, Toml},
        GatewayConfig,
    },
    kernel::local::LocalDispatcher,
    BoxError,
};
mod args;

/// Read the config once, before the runtime exists, to size the worker pool.
fn read_config(config: &args::Config) -> Result<GatewayConfig, BoxError> {
    match config {
        args::Config::File(path) => {
            let bytes = std::fs::read(path).map_err(|e| format!("fail to read {}: {e}", path.display()))?;
            if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
                Json::default().de(&bytes)
            } else {
                Toml::default().de(&bytes)
            }
        }
    }
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();
    let args = args::Args::parse();
    let config = read_config(&args.config)?;
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(worker_threads) = args.worker_threads.or(config.server.worker_threads).filter(|n| *n > 0) {
        builder.worker_threads(worker_threads);
    }
    let rt = builder.enable_all().thread_name(env!("CARGO_PKG_NAME")).build()?;
    rt.block_on(async move {
        match args.config {
            args::Config::File(path) => relaygate_shell::startup_file(path, LocalDispatcher::new()).await,
        }
    })
}
