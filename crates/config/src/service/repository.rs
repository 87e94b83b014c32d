use std::sync::{Mutex, PoisonError, RwLock};

use futures_util::{stream, stream::BoxStream, StreamExt};
use indexmap::IndexMap;
use relaygate_model::{BoxError, RouteDefinition};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use super::{ConfigEventType, ConfigType, ListenEvent, RouteDefinitionLocator, RouteDefinitionRepository};

/// Route definitions written at runtime, kept in insertion order.
///
/// Every change is announced to the receivers returned by [`subscribe`](Self::subscribe).
#[derive(Debug, Default)]
pub struct InMemoryRouteDefinitionRepository {
    routes: RwLock<IndexMap<String, RouteDefinition>>,
    subscribers: Mutex<Vec<UnboundedSender<ListenEvent>>>,
}

impl InMemoryRouteDefinitionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive an event for every later save or delete.
    pub fn subscribe(&self) -> UnboundedReceiver<ListenEvent> {
        let (tx, rx) = unbounded_channel();
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        self.routes.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn publish(&self, event: ListenEvent) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        // closed receivers are dropped here
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl RouteDefinitionLocator for InMemoryRouteDefinitionRepository {
    fn route_definitions(&self) -> BoxStream<'_, Result<RouteDefinition, BoxError>> {
        let routes: Vec<RouteDefinition> = self.routes.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect();
        stream::iter(routes.into_iter().map(Ok)).boxed()
    }
}

impl RouteDefinitionRepository for InMemoryRouteDefinitionRepository {
    async fn save(&self, definition: RouteDefinition) -> Result<(), BoxError> {
        if definition.id.is_empty() {
            return Err("id may not be empty".into());
        }
        let id = definition.id.clone();
        let replaced = self.routes.write().unwrap_or_else(PoisonError::into_inner).insert(id.clone(), definition).is_some();
        let r#type = if replaced { ConfigEventType::Update } else { ConfigEventType::Create };
        debug!(route = %id, kind = %r#type, "[Rg.Config] route definition saved");
        self.publish(ListenEvent::from((ConfigType::Route { id }, r#type)));
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), BoxError> {
        if self.routes.write().unwrap_or_else(PoisonError::into_inner).shift_remove(id).is_none() {
            return Err(format!("RouteDefinition not found: {id}").into());
        }
        debug!(route = %id, "[Rg.Config] route definition deleted");
        self.publish(ListenEvent::from((ConfigType::Route { id: id.to_string() }, ConfigEventType::Delete)));
        Ok(())
    }
}
