//! # csapp IPC
//!
//! Channel plumbing between the application process and the local system
//! server.
//!
//! - [`Channel`] is the bidirectional endpoint: synchronous request/reply via
//!   [`Channel::call`], plus a single-consumer notification stream.
//! - [`Connector`] abstracts the kernel's `connect_to_local` primitive.
//! - [`LocalServer`] / [`LocalConnector`] provide an in-process stand-in for the
//!   primary local service, used on hosted targets and in tests.
pub mod channel;
pub mod error;
pub mod local;
pub mod message;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

pub use channel::{Channel, Envelope, NotificationStream};
pub use error::IpcError;
pub use local::{JournalEntry, LocalConnector, LocalServer, LocalServerBuilder};
pub use message::{Device, Level, Notification, PinId, PinMode, Reply, Request, ServerFault, TimerId};

/// Identifier of a service reachable through `connect_to_local`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(pub u32);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service#{}", self.0)
    }
}

/// Well-known id of the primary local service
pub const PRIMARY_LOCAL_SERVICE: ServiceId = ServiceId(crate::kernel::constants::PRIMARY_LOCAL_SERVICE_ID);

/// Identifier the server assigns to an accepted channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

/// Obtains channels to local services.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the service registered under `service`.
    async fn connect_to_local(&self, service: ServiceId) -> Result<Channel, IpcError>;
}

#[async_trait]
impl<T: Connector + ?Sized> Connector for Arc<T> {
    async fn connect_to_local(&self, service: ServiceId) -> Result<Channel, IpcError> {
        (**self).connect_to_local(service).await
    }
}
