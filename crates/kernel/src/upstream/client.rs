use std::future::Future;

use hyper_rustls::{ConfigBuilderExt, HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use relaygate_model::HttpClientConfig;
use tokio_rustls::rustls;

use crate::{BoxError, RgBody, RgRequest, RgResponse};

/// Sends a request to an upstream and returns its response head with a streaming body.
pub trait HttpClient: Send + Sync + 'static {
    fn request(&self, req: RgRequest) -> impl Future<Output = Result<RgResponse, BoxError>> + Send;
}

/// Pooled http/https client.
#[derive(Debug, Clone)]
pub struct HyperClient {
    inner: Client<HttpsConnector<HttpConnector>, RgBody>,
}

impl HyperClient {
    pub fn new(config: &HttpClientConfig) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let tls_config = match rustls::ClientConfig::builder().with_native_roots() {
            Ok(builder) => builder.with_no_client_auth(),
            Err(e) => {
                tracing::warn!("[Rg.Client] fail to load native root certificates, https upstreams are unreachable: {e}");
                rustls::ClientConfig::builder().with_root_certificates(rustls::RootCertStore::empty()).with_no_client_auth()
            }
        };
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(config.connect_timeout());
        let connector = HttpsConnectorBuilder::new().with_tls_config(tls_config).https_or_http().enable_http1().enable_http2().wrap_connector(http);
        let mut builder = Client::builder(TokioExecutor::new());
        if let Some(idle) = config.pool_idle_timeout() {
            builder.pool_idle_timeout(idle);
        }
        Self { inner: builder.build(connector) }
    }
}

impl HttpClient for HyperClient {
    async fn request(&self, req: RgRequest) -> Result<RgResponse, BoxError> {
        let response = self.inner.request(req).await?;
        Ok(response.map(RgBody::new))
    }
}
