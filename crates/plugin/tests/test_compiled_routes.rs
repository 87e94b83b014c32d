use std::sync::Arc;

use hyper::{header, Method, Request, Response, StatusCode};
use relaygate_kernel::{
    dispatcher::{Dispatched, FilteringHandler, RouteDispatcher},
    exchange::{OriginalRequestUrls, RouteId},
    filter::{order, BoxFilter},
    global_filter::{ForwardRoutingFilter, RouteToRequestUrlFilter, WriteResponseFilter},
    local::LocalDispatcher,
    route::RouteLocator,
    BoxError, Exchange, RgBody, RgRequest, RgResponse,
};
use relaygate_model::GatewayConfig;
use relaygate_plugin::RouteCompiler;
use serde_json::json;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).try_init();
}

async fn echo_path(req: RgRequest) -> Result<RgResponse, BoxError> {
    Ok(Response::new(RgBody::full(format!("local {}", req.uri()))))
}

fn dispatcher(config: GatewayConfig) -> RouteDispatcher {
    let compiler = RouteCompiler::default().with_default_filters(config.default_filters);
    let table = compiler.compile_table(config.routes).expect("routes compile");
    let local = LocalDispatcher::new().route("/echo", echo_path).route("/health", echo_path);
    let global = vec![
        BoxFilter::new("write-response", WriteResponseFilter).ordered_or(order::WRITE_RESPONSE),
        BoxFilter::new("route-to-request-url", RouteToRequestUrlFilter).ordered_or(order::ROUTE_TO_URL),
        BoxFilter::new("forward-routing", ForwardRoutingFilter::new(local)).ordered_or(order::FORWARD_ROUTING),
    ];
    RouteDispatcher::new(Arc::new(RouteLocator::new(table)), Arc::new(FilteringHandler::new(global)))
}

fn config() -> GatewayConfig {
    serde_json::from_value(json!({
        "default_filters": ["add-response-header=x-gateway,relaygate"],
        "routes": [
            {
                "id": "legacy",
                "uri": "forward:///",
                "order": -1,
                "predicates": ["path=/legacy/**"],
                "filters": ["redirect-to=301,/v2/"]
            },
            {
                "id": "rewrite",
                "uri": "forward:///",
                "predicates": ["path=/api/**", "method=GET,HEAD"],
                "filters": [{"name": "rewrite-path", "args": {"regexp": "/api/(?<rest>.*)", "replacement": "/$\\{rest}"}}]
            },
            {
                "id": "catch-all",
                "uri": "forward:///",
                "order": 10,
                "predicates": [],
                "filters": ["no-such-filter"]
            }
        ]
    }))
    .expect("valid config")
}

#[tokio::test]
async fn test_unknown_filter_fails_whole_table() {
    init_tracing();
    let config = config();
    let err = RouteCompiler::default().compile_table(config.routes).expect_err("unknown filter");
    assert!(err.is_config_error());
    assert!(err.to_string().contains("catch-all"));
}

#[tokio::test]
async fn test_rewrite_then_forward() -> Result<(), BoxError> {
    init_tracing();
    let mut config = config();
    config.routes.retain(|route| route.id != "catch-all");
    let dispatcher = dispatcher(config);

    let mut exchange = Exchange::new(Request::get("/api/echo?x=1").body(RgBody::empty())?);
    let dispatched = dispatcher.dispatch(&mut exchange).await?;
    assert!(matches!(dispatched, Dispatched::Routed { ref route, .. } if route.id() == "rewrite"));
    assert_eq!(exchange.attribute::<RouteId>().map(|id| &*id.0), Some("rewrite"));
    assert_eq!(exchange.attribute::<OriginalRequestUrls>().map(|urls| urls.0.len()), Some(1));
    let response = exchange.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-gateway").map(|v| v.as_bytes()), Some(b"relaygate".as_slice()));
    assert_eq!(response.into_body().collect_bytes().await?, "local /echo?x=1");

    let mut exchange = Exchange::new(Request::builder().method(Method::POST).uri("/api/echo").body(RgBody::empty())?);
    assert!(matches!(dispatcher.dispatch(&mut exchange).await?, Dispatched::NoRoute));
    Ok(())
}

#[tokio::test]
async fn test_redirect_wins_by_order() -> Result<(), BoxError> {
    init_tracing();
    let mut config = config();
    config.routes.retain(|route| route.id != "catch-all");
    let dispatcher = dispatcher(config);

    let mut exchange = Exchange::new(Request::get("/legacy/page").body(RgBody::empty())?);
    dispatcher.dispatch(&mut exchange).await?;
    let response = exchange.into_response();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(response.headers().get(header::LOCATION).map(|v| v.as_bytes()), Some(b"/v2/".as_slice()));
    Ok(())
}
