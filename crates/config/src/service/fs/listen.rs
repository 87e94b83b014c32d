use std::task::ready;

use notify::{Event, EventKind, Watcher};
use relaygate_model::{BoxError, GatewayConfig};

use super::Fs;
use crate::service::{config_format::ConfigFormat, ConfigEventType, ConfigType, CreateListener, Listen, ListenEvent, Retrieve};

/// Reports a global update whenever the config file is written.
pub struct FsListener {
    // hold the watcher, prevent dropping
    _watcher: notify::RecommendedWatcher,
    rx: tokio::sync::mpsc::UnboundedReceiver<ListenEvent>,
}

impl<F> CreateListener for Fs<F>
where
    F: ConfigFormat + Clone + Send + Sync + 'static,
{
    const CONFIG_LISTENER_NAME: &'static str = "file";

    async fn create_listener(&self) -> Result<(GatewayConfig, Box<dyn Listen>), BoxError> {
        let config = self.retrieve_config().await?;
        Ok((config, Box::new(FsListener::new(self)?)))
    }
}

impl FsListener {
    pub fn new<F>(fs: &Fs<F>) -> Result<Self, BoxError>
    where
        F: ConfigFormat,
    {
        let (dir, file) = fs.watch_target()?;
        let (evt_tx, evt_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = notify::RecommendedWatcher::new(
            move |next: notify::Result<Event>| {
                let evt = match next {
                    Ok(evt) => evt,
                    Err(e) => {
                        tracing::warn!("[Rg.Config] file watcher error: {e}");
                        return;
                    }
                };
                if !matches!(evt.kind, EventKind::Create(_) | EventKind::Modify(_)) || !evt.paths.iter().any(|path| path == &file) {
                    return;
                }
                tracing::debug!(path = %file.display(), "[Rg.Config] config file changed");
                let _result = evt_tx.send(ListenEvent::from((ConfigType::Global, ConfigEventType::Update)));
            },
            Default::default(),
        )?;
        // the parent is watched so that editors replacing the file are noticed
        watcher.watch(&dir, notify::RecursiveMode::NonRecursive)?;
        Ok(Self { _watcher: watcher, rx: evt_rx })
    }
}

impl Listen for FsListener {
    fn poll_next(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<ListenEvent, BoxError>> {
        if let Some(next) = ready!(self.rx.poll_recv(cx)) {
            std::task::Poll::Ready(Ok(next))
        } else {
            std::task::Poll::Pending
        }
    }
}
