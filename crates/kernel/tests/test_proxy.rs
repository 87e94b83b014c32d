use std::{net::SocketAddr, sync::Arc, time::Duration};

use hyper::{header::HOST, HeaderMap, Request, StatusCode, Uri};
use relaygate_kernel::{
    dispatcher::{FilteringHandler, RouteDispatcher},
    exchange::GatewayName,
    filter::{BoxFilter, Flow, FnFilter, Next},
    global_filter::standard_global_filters,
    listener::RgListen,
    local::LocalDispatcher,
    predicate::Predicate,
    route::{Route, RouteLocator, RouteTable},
    service::GatewayService,
    upstream::{HttpClient, HyperClient, UpstreamForwarder},
    CancellationToken, Exchange, GatewayError, RgBody, RgRequest, RgResponse,
};
use relaygate_model::HttpClientConfig;
use tokio::net::TcpListener;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}

async fn upstream() -> SocketAddr {
    use axum::{routing::get, Router};
    async fn headers(headers: HeaderMap) -> String {
        let host = headers.get(HOST).and_then(|v| v.to_str().ok()).unwrap_or_default();
        let forwarded_for = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()).unwrap_or_default();
        format!("host={host};xff={forwarded_for}")
    }
    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(2)).await;
        "late"
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("fail to bind");
    let addr = listener.local_addr().expect("no local addr");
    let router = Router::new().route("/headers", get(headers)).route("/slow", get(slow));
    tokio::spawn(async move { axum::serve(listener, router).await.expect("fail to serve") });
    addr
}

fn strip_prefix(prefix: &'static str) -> BoxFilter {
    BoxFilter::new(
        "strip",
        FnFilter(move |exchange: &mut Exchange, next: Next| -> Result<Flow, GatewayError> {
            let uri = exchange.request().uri();
            let stripped = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/").strip_prefix(prefix).unwrap_or("/").to_string();
            *exchange.request_mut().uri_mut() = stripped.parse::<Uri>().map_err(GatewayError::internal)?;
            Ok(next.proceed())
        }),
    )
}

fn path_prefix(prefix: &'static str) -> Predicate {
    Predicate::from_fn(format!("path={prefix}"), move |exchange| exchange.request().uri().path().starts_with(prefix))
}

async fn gateway(upstream: SocketAddr, cancel: CancellationToken) -> SocketAddr {
    let upstream_uri = format!("http://{upstream}");
    let routes = RouteTable::new([
        Route::builder("echo", upstream_uri.parse().expect("valid uri"))
            .predicate(path_prefix("/echo"))
            .filters([strip_prefix("/echo").ordered_or(1)])
            .build(),
        Route::builder("slow", upstream_uri.parse().expect("valid uri"))
            .predicate(path_prefix("/slow"))
            .timeout(Some(Duration::from_millis(100)))
            .build(),
        Route::builder("local", "forward:///".parse().expect("valid uri"))
            .predicate(path_prefix("/local"))
            .filters([strip_prefix("/local").ordered_or(1)])
            .build(),
    ]);
    let local = LocalDispatcher::new().route("/health", |_req: RgRequest| async { Ok::<_, relaygate_kernel::BoxError>(RgResponse::new(RgBody::full("up"))) });
    let forwarder = UpstreamForwarder::new(HyperClient::new(&HttpClientConfig::default()));
    let dispatcher = RouteDispatcher::new(Arc::new(RouteLocator::new(routes)), Arc::new(FilteringHandler::new(standard_global_filters(forwarder, local))));
    let service = GatewayService::new(GatewayName::new("test_proxy"), dispatcher);
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("fail to bind");
    let addr = listener.local_addr().expect("no local addr");
    tokio::spawn(RgListen::new(addr, service, cancel).serve(listener));
    addr
}

async fn get(client: &HyperClient, gateway: SocketAddr, path: &str) -> (StatusCode, String) {
    let request = Request::get(format!("http://{gateway}{path}")).body(RgBody::empty()).expect("valid request");
    let response = client.request(request).await.expect("fail to send");
    let status = response.status();
    let body = response.into_body().collect_bytes().await.expect("fail to read body");
    (status, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn test_proxy() {
    init_tracing();
    let cancel = CancellationToken::new();
    let upstream = upstream().await;
    let gateway = gateway(upstream, cancel.clone()).await;
    let client = HyperClient::new(&HttpClientConfig::default());

    let (status, body) = get(&client, gateway, "/echo/headers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, format!("host={upstream};xff=127.0.0.1"));

    let (status, body) = get(&client, gateway, "/slow").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body.starts_with("[Rg.Upstream]"));

    let (status, body) = get(&client, gateway, "/local/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "up");

    let (status, _) = get(&client, gateway, "/local/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = get(&client, gateway, "/nothing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("no route"));

    cancel.cancel();
}

#[tokio::test]
async fn test_unreachable_upstream() {
    init_tracing();
    let cancel = CancellationToken::new();
    // bind then drop to get a port nobody listens on
    let closed = TcpListener::bind("127.0.0.1:0").await.expect("fail to bind").local_addr().expect("no local addr");
    let gateway = gateway(closed, cancel.clone()).await;
    let client = HyperClient::new(&HttpClientConfig::default());
    let (status, body) = get(&client, gateway, "/echo/headers").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.starts_with("[Rg.Upstream]"));
    cancel.cancel();
}
