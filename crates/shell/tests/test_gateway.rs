use std::{net::SocketAddr, sync::Arc, time::Duration};

use relaygate_config::service::{fs::Fs, config_format::Toml, Memory, RouteDefinitionRepository};
use relaygate_kernel::{
    local::LocalDispatcher,
    upstream::{HttpClient, HyperClient},
    CancellationToken, RgBody, RgRequest, RgResponse,
};
use relaygate_model::{GatewayConfig, HttpClientConfig, RouteDefinition, ServerConfig};
use relaygate_shell::{config::startup_with_shutdown_signal, server::RunningGateway};
use tokio::net::TcpListener;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}

async fn upstream() -> SocketAddr {
    use axum::{extract::Request, routing::get, Router};
    async fn path(req: Request) -> String {
        format!("upstream {}", req.uri())
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("fail to bind");
    let addr = listener.local_addr().expect("no local addr");
    let router = Router::new().route("/{*rest}", get(path));
    tokio::spawn(async move { axum::serve(listener, router).await.expect("fail to serve") });
    addr
}

fn server(port: u16) -> ServerConfig {
    ServerConfig {
        name: "test_gateway".into(),
        host: "127.0.0.1".into(),
        port,
        worker_threads: None,
    }
}

async fn get(gateway: SocketAddr, path: &str) -> (u16, String, Option<String>) {
    let client = HyperClient::new(&HttpClientConfig::default());
    let request = hyper::Request::get(format!("http://{gateway}{path}")).body(RgBody::empty()).expect("valid request");
    let response = client.request(request).await.expect("fail to send");
    let status = response.status().as_u16();
    let marker = response.headers().get("x-gateway").and_then(|v| v.to_str().ok()).map(str::to_string);
    let body = response.into_body().collect_bytes().await.expect("fail to read body");
    (status, String::from_utf8_lossy(&body).into_owned(), marker)
}

#[tokio::test]
async fn test_repository_refresh() {
    init_tracing();
    let upstream = upstream().await;
    let config = GatewayConfig {
        server: server(0),
        default_filters: vec!["add-response-header=x-gateway,relaygate".parse().expect("valid shorthand")],
        routes: vec![RouteDefinition::new("api", format!("http://{upstream}"))
            .predicate("path=/api/**".parse().expect("valid shorthand"))
            .filter("strip-prefix=1".parse().expect("valid shorthand"))],
        ..Default::default()
    };
    let local = LocalDispatcher::new().route("/ping", |_req: RgRequest| async { Ok::<_, relaygate_kernel::BoxError>(RgResponse::new(RgBody::full("pong"))) });
    let cancel = CancellationToken::new();
    let gateway = RunningGateway::create(&config, Arc::new(Memory::new(config.clone())), local, cancel.child_token()).await.expect("gateway starts");

    let (status, body, marker) = get(gateway.local_addr, "/api/users?id=1").await;
    assert_eq!(status, 200);
    assert_eq!(body, "upstream /users?id=1");
    assert_eq!(marker.as_deref(), Some("relaygate"));

    assert_eq!(get(gateway.local_addr, "/ping").await.0, 404);
    gateway
        .repository()
        .save(RouteDefinition::new("ping", "forward:///ping").predicate("path=/ping".parse().expect("valid shorthand")))
        .await
        .expect("saved");
    gateway.refresh().await.expect("refreshed");
    let (status, body, _) = get(gateway.local_addr, "/ping").await;
    assert_eq!((status, body.as_str()), (200, "pong"));

    // a broken definition keeps the previous table
    gateway.repository().save(RouteDefinition::new("broken", "http://localhost").filter("no-such-filter".parse().expect("valid shorthand"))).await.expect("saved");
    assert!(gateway.refresh().await.is_err());
    assert_eq!(gateway.routes().snapshot().len(), 2);
    assert_eq!(get(gateway.local_addr, "/ping").await.0, 200);

    gateway.repository().delete("broken").await.expect("deleted");
    gateway.repository().delete("ping").await.expect("deleted");
    gateway.refresh().await.expect("refreshed");
    assert_eq!(get(gateway.local_addr, "/ping").await.0, 404);

    gateway.shutdown().await;
}

#[tokio::test]
async fn test_invalid_initial_routes() {
    init_tracing();
    let config = GatewayConfig {
        server: server(0),
        routes: vec![RouteDefinition::new("bad", "http://localhost").predicate("weekday=monday".parse().expect("valid shorthand"))],
        ..Default::default()
    };
    let result = RunningGateway::create(&config, Arc::new(Memory::new(config.clone())), LocalDispatcher::new(), CancellationToken::new()).await;
    let err = result.expect_err("unknown predicate");
    assert!(err.to_string().contains("weekday"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_reload() {
    init_tracing();
    let upstream = upstream().await;
    // bind then drop to find a free port
    let port = TcpListener::bind("127.0.0.1:0").await.expect("fail to bind").local_addr().expect("no local addr").port();
    let gateway: SocketAddr = ([127, 0, 0, 1], port).into();
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("relaygate.toml");
    let write = |routes: &str| {
        let text = format!("[server]\nname = \"file\"\nhost = \"127.0.0.1\"\nport = {port}\n{routes}");
        std::fs::write(&path, text).expect("write config");
    };
    let first = format!("[[routes]]\nid = \"first\"\nuri = \"http://{upstream}\"\npredicates = [\"path=/first\"]\n");
    write(&first);

    let cancel = CancellationToken::new();
    let task = tokio::spawn(startup_with_shutdown_signal(Fs::new(&path, Toml::default()), LocalDispatcher::new(), cancel.clone()));
    let mut started = false;
    for _ in 0..50 {
        if TcpListener::bind(gateway).await.is_err() {
            started = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(started, "gateway did not start");
    assert_eq!(get(gateway, "/first").await.0, 200);
    assert_eq!(get(gateway, "/second").await.0, 404);

    let second = format!("[[routes]]\nid = \"second\"\nuri = \"http://{upstream}\"\npredicates = [\"path=/second\"]\n");
    write(&format!("{first}\n{second}"));
    let mut reloaded = false;
    for _ in 0..100 {
        if get(gateway, "/second").await.0 == 200 {
            reloaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(reloaded, "route table was not reloaded");

    // an unreadable file keeps the routes
    std::fs::write(&path, "[[routes").expect("write config");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(get(gateway, "/first").await.0, 200);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(15), task).await.expect("shutdown in time").expect("task joined").expect("clean shutdown");
}
