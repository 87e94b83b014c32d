use std::{collections::HashMap, fmt, future::Future, sync::Arc};

use futures_util::future::BoxFuture;
use hyper::{Response, StatusCode};
use tracing::debug;

use crate::{BoxError, RgBody, RgRequest, RgResponse, RgResponseExt};

/// A handler served by the gateway itself, reached through `forward:` routes.
pub trait LocalHandler: Send + Sync + 'static {
    fn call(&self, req: RgRequest) -> BoxFuture<'static, Result<RgResponse, BoxError>>;
}

impl<F, Fut> LocalHandler for F
where
    F: Fn(RgRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RgResponse, BoxError>> + Send + 'static,
{
    fn call(&self, req: RgRequest) -> BoxFuture<'static, Result<RgResponse, BoxError>> {
        Box::pin(self(req))
    }
}

/// Path to handler map for local requests.
#[derive(Clone, Default)]
pub struct LocalDispatcher {
    handlers: HashMap<String, Arc<dyn LocalHandler>>,
}

impl fmt::Debug for LocalDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalDispatcher").field("paths", &self.handlers.keys().collect::<Vec<_>>()).finish()
    }
}

impl LocalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn route(mut self, path: impl Into<String>, handler: impl LocalHandler) -> Self {
        self.handlers.insert(path.into(), Arc::new(handler));
        self
    }
    pub fn contains(&self, path: &str) -> bool {
        self.handlers.contains_key(path)
    }

    /// Serve `req` with the handler registered for its path, `404` when there is none.
    ///
    /// # Errors
    /// Whatever the handler fails with.
    pub async fn dispatch(&self, req: RgRequest) -> Result<RgResponse, BoxError> {
        match self.handlers.get(req.uri().path()) {
            Some(handler) => handler.call(req).await,
            None => {
                debug!(path = req.uri().path(), "[Rg.Local] no local handler");
                Ok(Response::<RgBody>::with_code_message(StatusCode::NOT_FOUND, "[Rg.Local] not found"))
            }
        }
    }
}
