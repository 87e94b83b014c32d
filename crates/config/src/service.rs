use std::{fmt::Display, str::FromStr, sync::Arc};

use futures_util::{stream::BoxStream, Future};
use relaygate_model::{BoxError, GatewayConfig, RouteDefinition};
use serde::{Deserialize, Serialize};

/// Composite locator
pub mod composite;
/// Config file format
pub mod config_format;
/// File system backend
#[cfg(feature = "fs")]
pub mod fs;
/// In-memory backend
pub mod memory;
/// Writable in-memory repository
pub mod repository;

pub use composite::CompositeLocator;
pub use config_format::ConfigFormat;
#[cfg(feature = "fs")]
pub use fs::Fs;
pub use memory::Memory;
pub use repository::InMemoryRouteDefinitionRepository;

/// A source of route definitions.
///
/// The stream is lazy: nothing is read before it is polled, and every call reads the source anew.
pub trait RouteDefinitionLocator: Send + Sync {
    fn route_definitions(&self) -> BoxStream<'_, Result<RouteDefinition, BoxError>>;
}

impl<T: RouteDefinitionLocator + ?Sized> RouteDefinitionLocator for Arc<T> {
    fn route_definitions(&self) -> BoxStream<'_, Result<RouteDefinition, BoxError>> {
        self.as_ref().route_definitions()
    }
}

/// A route definition locator that can be written to.
pub trait RouteDefinitionRepository: RouteDefinitionLocator {
    /// Create the definition, or replace the one with the same id.
    fn save(&self, definition: RouteDefinition) -> impl Future<Output = Result<(), BoxError>> + Send;
    /// Delete the definition with the given id.
    fn delete(&self, id: &str) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// Read the whole gateway config.
pub trait Retrieve: Sync + Send {
    fn retrieve_config(&self) -> impl Future<Output = Result<GatewayConfig, BoxError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigEventType {
    Create,
    Update,
    Delete,
}

impl FromStr for ConfigEventType {
    type Err = BoxError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("unknown ConfigEventType: {}", s).into()),
        }
    }
}

impl Display for ConfigEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ConfigType {
    Route {
        id: String,
    },
    /// the whole config changed, the shell would reload all
    Global,
}

impl Display for ConfigType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Route { id } => write!(f, "route/{}", id),
            Self::Global => write!(f, "global"),
        }
    }
}

impl FromStr for ConfigType {
    type Err = BoxError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some(("route", id)) if !id.is_empty() => Ok(Self::Route { id: id.to_string() }),
            None if s == "global" => Ok(Self::Global),
            _ => Err(format!("unknown ConfigType: {}", s).into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenEvent {
    pub r#type: ConfigEventType,
    pub config: ConfigType,
}

impl From<(ConfigType, ConfigEventType)> for ListenEvent {
    fn from((config, r#type): (ConfigType, ConfigEventType)) -> Self {
        Self { r#type, config }
    }
}

impl Display for ListenEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.r#type, self.config)
    }
}

/// Provide the initial config together with a listener of later changes.
pub trait CreateListener {
    const CONFIG_LISTENER_NAME: &'static str;
    fn create_listener(&self) -> impl Future<Output = Result<(GatewayConfig, Box<dyn Listen>), BoxError>> + Send;
}

/// A stream of config change events.
pub trait Listen: Unpin + Send {
    fn poll_next(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<ListenEvent, BoxError>>;
}

impl Listen for Box<dyn Listen> {
    fn poll_next(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<ListenEvent, BoxError>> {
        self.as_mut().poll_next(cx)
    }
}

pub trait ListenExt: Listen {
    fn join<L1>(self, l1: L1) -> Joint<Self, L1>
    where
        L1: Listen,
        Self: Sized,
    {
        Joint { l0: self, l1 }
    }
    /// Wait for the next event.
    fn next_event(&mut self) -> impl Future<Output = Result<ListenEvent, BoxError>> + Send
    where
        Self: Sized,
    {
        futures_util::future::poll_fn(move |cx| self.poll_next(cx))
    }
}

impl<T: Listen> ListenExt for T {}

pub struct Joint<L0, L1> {
    l0: L0,
    l1: L1,
}

impl<L0, L1> Listen for Joint<L0, L1>
where
    L0: Listen,
    L1: Listen,
{
    fn poll_next(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<ListenEvent, BoxError>> {
        // l0 has higher priority
        let l0 = self.l0.poll_next(cx);
        if l0.is_ready() {
            return l0;
        }
        self.l1.poll_next(cx)
    }
}

impl Listen for tokio::sync::mpsc::Receiver<ListenEvent> {
    fn poll_next(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<ListenEvent, BoxError>> {
        self.poll_recv(cx).map(|r| r.ok_or("channel closed".into()))
    }
}

impl Listen for tokio::sync::mpsc::UnboundedReceiver<ListenEvent> {
    fn poll_next(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<ListenEvent, BoxError>> {
        self.poll_recv(cx).map(|r| r.ok_or("channel closed".into()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_type_text() {
        let route: ConfigType = "route/api".parse().expect("valid config type");
        assert_eq!(route, ConfigType::Route { id: "api".into() });
        assert_eq!(route.to_string(), "route/api");
        assert_eq!("global".parse::<ConfigType>().expect("valid config type"), ConfigType::Global);
        assert!("gateway/x".parse::<ConfigType>().is_err());
        assert!("route/".parse::<ConfigType>().is_err());
    }

    #[tokio::test]
    async fn test_joint_prefers_first() {
        let (tx0, rx0) = tokio::sync::mpsc::unbounded_channel();
        let (tx1, rx1) = tokio::sync::mpsc::unbounded_channel();
        let mut joint = rx0.join(rx1);
        tx1.send(ListenEvent::from((ConfigType::Global, ConfigEventType::Update))).expect("receiver alive");
        tx0.send(ListenEvent::from((ConfigType::Route { id: "a".into() }, ConfigEventType::Create))).expect("receiver alive");
        assert_eq!(joint.next_event().await.expect("event").config, ConfigType::Route { id: "a".into() });
        assert_eq!(joint.next_event().await.expect("event").config, ConfigType::Global);
    }
}
