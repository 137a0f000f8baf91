//! # csapp IPC Errors
//!
//! Defines [`IpcError`], covering failures to reach a local service and
//! failures of individual calls on an established channel.
use thiserror::Error;

use crate::ipc::message::{Reply, ServerFault};
use crate::ipc::{ChannelId, ServiceId};

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("No local service registered under {service}")]
    ServiceNotFound { service: ServiceId },

    #[error("{service} refused the connection: {reason}")]
    ConnectionRefused { service: ServiceId, reason: String },

    #[error("Timed out after {timeout_ms} ms connecting to {service}")]
    ConnectTimeout { service: ServiceId, timeout_ms: u64 },

    #[error("{channel} is closed")]
    ChannelClosed { channel: ChannelId },

    #[error("Request '{request}' rejected by the server: {fault}")]
    Rejected {
        request: &'static str,
        #[source]
        fault: ServerFault,
    },

    #[error("Unexpected reply to '{request}': {reply:?}")]
    UnexpectedReply { request: &'static str, reply: Reply },

    #[error("Notification stream of {channel} has already been taken")]
    NotificationsTaken { channel: ChannelId },
}

impl IpcError {
    /// The server fault behind a rejected request, if any
    pub fn fault(&self) -> Option<&ServerFault> {
        match self {
            IpcError::Rejected { fault, .. } => Some(fault),
            _ => None,
        }
    }
}
