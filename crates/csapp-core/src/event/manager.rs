use std::collections::VecDeque;
use std::sync::{Mutex as StdMutex, PoisonError};

use tokio::sync::Mutex;

use crate::event::dispatcher::{self, EventDispatcher, NamedHandlerFn, TypedHandlerFn};
use crate::event::{Event, EventId, EventResult};

/// Type alias for boxed event
pub type BoxedEvent = Box<dyn Event>;

/// Shared front end to the dispatcher plus a queue for deferred events.
///
/// Handlers must not dispatch, register or unregister from inside a dispatch;
/// queueing events from a handler is fine.
#[derive(Debug, Default)]
pub struct EventManager {
    dispatcher: Mutex<EventDispatcher>,
    queue: StdMutex<VecDeque<BoxedEvent>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for events with a specific name
    pub async fn register_handler(&self, event_name: &'static str, handler: NamedHandlerFn) -> EventId {
        self.dispatcher.lock().await.register_handler(event_name, handler)
    }

    /// Register a handler for events of a specific type
    pub async fn register_type_handler<E: Event + 'static>(&self, handler: TypedHandlerFn<E>) -> EventId {
        self.dispatcher.lock().await.register_type_handler::<E>(handler)
    }

    /// Register a synchronous handler for events with a specific name
    pub async fn register_sync_handler<F>(&self, event_name: &'static str, handler: F) -> EventId
    where
        F: Fn(&dyn Event) -> EventResult + Send + Sync + 'static,
    {
        self.register_handler(event_name, dispatcher::sync_event_handler(handler)).await
    }

    /// Register a synchronous handler for events of a specific type
    pub async fn register_sync_type_handler<E, F>(&self, handler: F) -> EventId
    where
        E: Event + 'static,
        F: Fn(&E) -> EventResult + Send + Sync + 'static,
    {
        self.register_type_handler::<E>(dispatcher::sync_typed_handler(handler)).await
    }

    /// Unregister a handler by its ID
    pub async fn unregister_handler(&self, id: EventId) -> bool {
        self.dispatcher.lock().await.unregister_handler(id)
    }

    /// Dispatch an event to its handlers right away
    pub async fn dispatch(&self, event: &dyn Event) -> EventResult {
        self.dispatcher.lock().await.dispatch(event).await
    }

    /// Queue an event for the next `process_queue`
    pub fn queue_event(&self, event: BoxedEvent) {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).push_back(event);
    }

    /// Dispatch queued events in FIFO order, including ones queued meanwhile.
    pub async fn process_queue(&self) -> usize {
        let mut count = 0;
        loop {
            let next = self.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front();
            let Some(event) = next else { break };
            self.dispatch(&*event).await;
            count += 1;
        }
        count
    }

    pub fn queue_size(&self) -> usize {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub async fn handler_count(&self) -> usize {
        self.dispatcher.lock().await.handler_count()
    }
}
