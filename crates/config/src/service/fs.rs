use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures_util::{future, stream, stream::BoxStream, StreamExt};
use relaygate_model::{BoxError, GatewayConfig, RouteDefinition};

use super::{config_format::ConfigFormat, Retrieve, RouteDefinitionLocator};

mod listen;
pub use listen::FsListener;

/// # Filesystem Configuration Backend
///
/// One file holds the whole [`GatewayConfig`], in the given format:
/// ``` no_rust
/// server = { name = "edge", port = 8080 }
/// default_filters = ["add-response-header=x-gateway,relaygate"]
///
/// [[routes]]
/// id = "api"
/// uri = "http://localhost:9000"
/// predicates = ["path=/api/**"]
/// ```
///
/// The file is read again on every retrieval.
#[derive(Debug, Clone)]
pub struct Fs<F> {
    pub path: Arc<Path>,
    pub format: F,
}

impl<F> Fs<F>
where
    F: ConfigFormat,
{
    pub fn new<P: AsRef<Path>>(path: P, format: F) -> Self {
        Self {
            path: Arc::from(path.as_ref()),
            format,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// Write `config` to the file, replacing its content.
    pub async fn save_config(&self, config: &GatewayConfig) -> Result<(), BoxError> {
        let bytes = self.format.ser(config)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }

    /// The directory to watch and the absolute file path.
    pub(crate) fn watch_target(&self) -> Result<(PathBuf, PathBuf), BoxError> {
        let file_name = self.path.file_name().ok_or_else(|| format!("{} is not a file path", self.path.display()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = dir.canonicalize()?;
        let file = dir.join(file_name);
        Ok((dir, file))
    }
}

impl<F> Retrieve for Fs<F>
where
    F: ConfigFormat + Send + Sync,
{
    async fn retrieve_config(&self) -> Result<GatewayConfig, BoxError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| format!("fail to read {}: {e}", self.path.display()))?;
        let config = self.format.de::<GatewayConfig>(&bytes).map_err(|e| format!("fail to parse {}: {e}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), routes = config.routes.len(), "[Rg.Config] config file loaded");
        Ok(config)
    }
}

impl<F> RouteDefinitionLocator for Fs<F>
where
    F: ConfigFormat + Send + Sync,
{
    fn route_definitions(&self) -> BoxStream<'_, Result<RouteDefinition, BoxError>> {
        stream::once(self.retrieve_config())
            .flat_map(|result| match result {
                Ok(config) => stream::iter(config.routes.into_iter().map(Ok)).left_stream(),
                Err(e) => stream::once(future::ready(Err(e))).right_stream(),
            })
            .boxed()
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use futures_util::TryStreamExt;

    use super::*;
    use crate::service::{
        config_format::{Json, Toml},
        ConfigEventType, ConfigType, CreateListener, ListenExt,
    };

    const TOML: &str = r#"
[server]
name = "fs-test"

[[routes]]
id = "first"
uri = "http://localhost:9001"
predicates = ["path=/first/**"]

[[routes]]
id = "second"
uri = "forward:///local"
order = -1
"#;

    #[tokio::test]
    async fn test_load_toml() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("relaygate.toml");
        std::fs::write(&path, TOML).expect("write config");
        let fs = Fs::new(&path, Toml::default());
        let config = fs.retrieve_config().await.expect("valid config");
        assert_eq!(config.server.name, "fs-test");
        let ids: Vec<String> = fs.route_definitions().map_ok(|route| route.id).try_collect().await.expect("valid config");
        assert_eq!(ids, ["first", "second"]);
    }

    #[tokio::test]
    async fn test_load_json_and_errors() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("relaygate.json");
        let fs = Fs::new(&path, Json::default());
        let missing: Vec<Result<RouteDefinition, BoxError>> = fs.route_definitions().collect().await;
        assert!(matches!(missing.as_slice(), [Err(_)]));

        let mut config = GatewayConfig::default();
        config.routes.push(RouteDefinition::new("json", "http://localhost").predicate("method=GET".parse().expect("valid shorthand")));
        fs.save_config(&config).await.expect("saved");
        assert_eq!(fs.retrieve_config().await.expect("reloaded"), config);

        std::fs::write(&path, "{ not json").expect("write config");
        assert!(fs.retrieve_config().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watch_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("relaygate.toml");
        std::fs::write(&path, TOML).expect("write config");
        let fs = Fs::new(&path, Toml::default());
        let (config, mut listener) = fs.create_listener().await.expect("listener");
        assert_eq!(config.routes.len(), 2);

        std::fs::write(dir.path().join("unrelated.txt"), "x").expect("write other file");
        std::fs::write(&path, TOML.replace("fs-test", "fs-test-2")).expect("rewrite config");
        let event = tokio::time::timeout(Duration::from_secs(10), listener.next_event()).await.expect("event in time").expect("watcher alive");
        assert_eq!(event.config, ConfigType::Global);
        assert_eq!(event.r#type, ConfigEventType::Update);
        assert_eq!(fs.retrieve_config().await.expect("reloaded").server.name, "fs-test-2");
    }
}
