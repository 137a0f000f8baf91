use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::event::{AsyncEventHandler, Event, EventId, EventResult};

// This type represents an owned future that returns EventResult
pub type BoxFuture<'a> = Pin<Box<dyn Future<Output = EventResult> + Send + 'a>>;

/// Handler closure keyed by event name
pub type NamedHandlerFn = Box<dyn Fn(&dyn Event) -> BoxFuture<'_> + Send + Sync>;

/// Handler closure keyed by concrete event type
pub type TypedHandlerFn<E> = Box<dyn Fn(&E) -> BoxFuture<'_> + Send + Sync>;

/// Routes events to the handlers registered for their name or their type
pub struct EventDispatcher {
    handlers: HashMap<&'static str, Vec<(EventId, Box<dyn AsyncEventHandler>)>>,
    type_handlers: HashMap<TypeId, Vec<(EventId, Box<dyn AsyncEventHandler>)>>,
    next_handler_id: EventId,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_handler_count: usize = self.handlers.values().map(|v| v.len()).sum();
        let type_handler_count: usize = self.type_handlers.values().map(|v| v.len()).sum();
        f.debug_struct("EventDispatcher")
            .field("name_handlers_count", &name_handler_count)
            .field("type_handlers_count", &type_handler_count)
            .field("next_handler_id", &self.next_handler_id)
            .finish()
    }
}

struct SimpleHandler {
    handler: NamedHandlerFn,
}

#[async_trait]
impl AsyncEventHandler for SimpleHandler {
    async fn handle(&self, event: &dyn Event) -> EventResult {
        (self.handler)(event).await
    }
}

/// Handler for typed events that will check the type
struct TypedEventHandler<E: Event + 'static> {
    handler: TypedHandlerFn<E>,
}

#[async_trait]
impl<E: Event + 'static> AsyncEventHandler for TypedEventHandler<E> {
    async fn handle(&self, event: &dyn Event) -> EventResult {
        match event.as_any().downcast_ref::<E>() {
            Some(e) => (self.handler)(e).await,
            None => EventResult::Continue,
        }
    }
}

async fn run_handlers(handlers: &[(EventId, Box<dyn AsyncEventHandler>)], event: &dyn Event) -> EventResult {
    for (_, handler) in handlers {
        if handler.handle(event).await == EventResult::Stop {
            return EventResult::Stop;
        }
    }
    EventResult::Continue
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            type_handlers: HashMap::new(),
            next_handler_id: 1,
        }
    }

    fn next_id(&mut self) -> EventId {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        id
    }

    pub fn register_handler(&mut self, event_name: &'static str, handler: NamedHandlerFn) -> EventId {
        let id = self.next_id();
        self.handlers
            .entry(event_name)
            .or_default()
            .push((id, Box::new(SimpleHandler { handler })));
        id
    }

    pub fn register_type_handler<E: Event + 'static>(&mut self, handler: TypedHandlerFn<E>) -> EventId {
        let id = self.next_id();
        self.type_handlers
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, Box::new(TypedEventHandler { handler })));
        id
    }

    pub fn unregister_handler(&mut self, id: EventId) -> bool {
        let mut found = false;
        for handlers in self.handlers.values_mut().chain(self.type_handlers.values_mut()) {
            let len_before = handlers.len();
            handlers.retain(|(h_id, _)| *h_id != id);
            found |= handlers.len() < len_before;
        }
        found
    }

    /// Name handlers run first, then type handlers; `Stop` from any handler ends propagation.
    pub async fn dispatch(&self, event: &dyn Event) -> EventResult {
        if let Some(handlers) = self.handlers.get(event.name()) {
            if run_handlers(handlers, event).await == EventResult::Stop {
                return EventResult::Stop;
            }
        }
        match self.type_handlers.get(&event.as_any().type_id()) {
            Some(handlers) => run_handlers(handlers, event).await,
            None => EventResult::Continue,
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.values().chain(self.type_handlers.values()).map(Vec::len).sum()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Box an async handler closure keyed by event name
pub fn event_handler<F>(f: F) -> NamedHandlerFn
where
    F: for<'a> Fn(&'a dyn Event) -> BoxFuture<'a> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Box an async handler closure keyed by event type
pub fn typed_handler<E, F>(f: F) -> TypedHandlerFn<E>
where
    E: Event + 'static,
    F: for<'a> Fn(&'a E) -> BoxFuture<'a> + Send + Sync + 'static,
{
    Box::new(f)
}

/// Helper function to create synchronous handlers that are compatible with async system
pub fn sync_event_handler<F>(f: F) -> NamedHandlerFn
where
    F: Fn(&dyn Event) -> EventResult + Send + Sync + 'static,
{
    event_handler(move |event| {
        let result = f(event);
        Box::pin(async move { result })
    })
}

/// Helper function to create typed synchronous handlers
pub fn sync_typed_handler<E, F>(f: F) -> TypedHandlerFn<E>
where
    E: Event + 'static,
    F: Fn(&E) -> EventResult + Send + Sync + 'static,
{
    typed_handler(move |event| {
        let result = f(event);
        Box::pin(async move { result })
    })
}
