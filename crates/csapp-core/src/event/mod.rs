//! # csapp Events
//!
//! Publish/subscribe plumbing shared by the bootstrap coordinator and the run
//! loop. [`SystemEvent`]s trace the bootstrap sequence; [`DeviceEvent`]s carry
//! hardware notifications into the application.
pub mod dispatcher;
pub mod manager;
pub mod types;

use std::any::Any;
use std::fmt;

use async_trait::async_trait;

/// Type for event handler identifiers
pub type EventId = u64;

/// Result of event processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Event was processed successfully and propagation should continue
    Continue,
    /// Event was processed and propagation should stop
    Stop,
}

/// Core event trait
pub trait Event: Any + fmt::Debug + Send + Sync {
    /// Get the name of this event
    fn name(&self) -> &'static str;

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Asynchronous event handler trait
#[async_trait]
pub trait AsyncEventHandler: Send + Sync {
    async fn handle(&self, event: &dyn Event) -> EventResult;
}

/// Re-export important types
pub use dispatcher::{
    event_handler, sync_event_handler, sync_typed_handler, typed_handler, BoxFuture, EventDispatcher,
};
pub use manager::{BoxedEvent, EventManager};
pub use types::{DeviceEvent, SystemEvent};

// Test module declaration
#[cfg(test)]
mod tests;
