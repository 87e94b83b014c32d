use futures_util::future::BoxFuture;
use hyper::{body::Incoming, service::Service, Request, Response};
use hyper_util::rt::{self, TokioIo};

use std::{convert::Infallible, net::SocketAddr, time::Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{exchange::PeerAddr, utils::with_length_or_chunked, BoxError, RgBody};

/// Accepts tcp connections and serves http/1 and http/2 on them.
#[derive(Clone)]
pub struct RgListen<S> {
    conn_builder: hyper_util::server::conn::auto::Builder<rt::TokioExecutor>,
    pub socket_addr: SocketAddr,
    pub service: S,
    pub cancel_token: CancellationToken,
    pub listener_id: String,
}

impl<S> std::fmt::Debug for RgListen<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RgListen").field("socket_addr", &self.socket_addr).field("listener_id", &self.listener_id).finish_non_exhaustive()
    }
}

impl<S> RgListen<S> {
    pub fn new(socket_addr: SocketAddr, service: S, cancel_token: CancellationToken) -> Self {
        let listener_id = format!("{socket_addr}");
        Self {
            conn_builder: hyper_util::server::conn::auto::Builder::new(rt::TokioExecutor::new()),
            socket_addr,
            service,
            cancel_token,
            listener_id,
        }
    }
}

#[derive(Clone)]
struct HyperServiceAdapter<S> {
    service: S,
    peer: SocketAddr,
}

impl<S> hyper::service::Service<Request<Incoming>> for HyperServiceAdapter<S>
where
    S: hyper::service::Service<Request<RgBody>, Error = Infallible, Response = Response<RgBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<RgBody>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    #[inline]
    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let enter_time = Instant::now();
        let service = self.service.clone();
        let mut req = req.map(RgBody::new);
        req.extensions_mut().insert(PeerAddr(self.peer));

        Box::pin(async move {
            let mut resp = match service.call(req).await {
                Ok(resp) => resp,
                Err(never) => match never {},
            };
            with_length_or_chunked(&mut resp);
            let status = resp.status();
            if status.is_server_error() {
                tracing::warn!(status = ?status, headers = ?resp.headers(), "server error response");
            } else if status.is_client_error() {
                tracing::debug!(status = ?status, headers = ?resp.headers(), "client error response");
            } else {
                tracing::trace!(status = ?status, headers = ?resp.headers(), "response");
            }
            tracing::trace!(latency = ?enter_time.elapsed(), "request finished");
            Ok(resp)
        })
    }
}

impl<S> RgListen<S>
where
    S: hyper::service::Service<Request<RgBody>, Error = Infallible, Response = Response<RgBody>> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
{
    #[instrument(skip(stream, service, conn_builder))]
    async fn accept(conn_builder: hyper_util::server::conn::auto::Builder<rt::TokioExecutor>, stream: TcpStream, peer_addr: SocketAddr, service: S) {
        tracing::debug!("[Rg.Listen] Accepted connection");
        let service = HyperServiceAdapter { service, peer: peer_addr };
        let io = TokioIo::new(stream);
        let conn_result = conn_builder.serve_connection_with_upgrades(io, service).await;
        if let Err(e) = conn_result {
            tracing::warn!("[Rg.Listen] Connection closed with error {e}")
        } else {
            tracing::debug!("[Rg.Listen] Connection closed");
        }
    }

    /// Bind `socket_addr` and serve until cancelled.
    ///
    /// # Errors
    /// If the address cannot be bound.
    #[instrument()]
    pub async fn listen(self) -> Result<(), BoxError> {
        tracing::debug!("[Rg.Listen] start binding...");
        let listener = TcpListener::bind(self.socket_addr).await?;
        self.serve(listener).await
    }

    /// Serve connections accepted by an already bound listener until cancelled.
    ///
    /// # Errors
    /// Never fails once the listener is bound, accept errors are logged.
    pub async fn serve(self, listener: TcpListener) -> Result<(), BoxError> {
        let cancel_token = self.cancel_token;
        tracing::info!(addr = ?listener.local_addr().ok(), "[Rg.Listen] start listening...");
        loop {
            let accepted = tokio::select! {
                () = cancel_token.cancelled() => {
                    tracing::warn!("[Rg.Listen] cancelled");
                    return Ok(());
                },
                accepted = listener.accept() => accepted
            };
            match accepted {
                Ok((stream, peer_addr)) => {
                    let service = self.service.clone();
                    let builder = self.conn_builder.clone();
                    tokio::spawn(Self::accept(builder, stream, peer_addr, service));
                }
                Err(e) => {
                    tracing::warn!("[Rg.Listen] Accept tcp connection error: {:?}", e);
                }
            }
        }
    }
}
