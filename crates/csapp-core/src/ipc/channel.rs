use std::sync::{Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};

use crate::ipc::error::IpcError;
use crate::ipc::message::{Notification, Reply, Request, ServerFault};
use crate::ipc::{ChannelId, ServiceId};

/// A request in flight, paired with the slot its reply goes to
#[derive(Debug)]
pub struct Envelope {
    pub request: Request,
    pub reply_to: oneshot::Sender<Result<Reply, ServerFault>>,
}

/// Bidirectional endpoint to a local service.
///
/// Requests are answered one by one through [`Channel::call`]. Notifications
/// pushed by the server are read through the stream returned by
/// [`Channel::take_notifications`], which has exactly one consumer.
#[derive(Debug)]
pub struct Channel {
    id: ChannelId,
    service: ServiceId,
    requests: mpsc::UnboundedSender<Envelope>,
    notifications: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
}

impl Channel {
    /// Assemble a channel from the endpoints a [`Connector`](crate::ipc::Connector) set up.
    pub fn from_parts(
        id: ChannelId,
        service: ServiceId,
        requests: mpsc::UnboundedSender<Envelope>,
        notifications: mpsc::UnboundedReceiver<Notification>,
    ) -> Self {
        Self {
            id,
            service,
            requests,
            notifications: Mutex::new(Some(notifications)),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn service(&self) -> ServiceId {
        self.service
    }

    /// Whether the server side has gone away
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    /// Send a request and wait for its reply.
    pub async fn call(&self, request: Request) -> Result<Reply, IpcError> {
        let name = request.name();
        let (reply_to, reply) = oneshot::channel();
        log::trace!("[{}] -> {}", self.id, name);

        self.requests
            .send(Envelope { request, reply_to })
            .map_err(|_| IpcError::ChannelClosed { channel: self.id })?;

        match reply.await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(fault)) => {
                log::debug!("[{}] '{}' rejected: {}", self.id, name, fault);
                Err(IpcError::Rejected { request: name, fault })
            }
            Err(_) => Err(IpcError::ChannelClosed { channel: self.id }),
        }
    }

    /// Send a request that must be answered with [`Reply::Done`].
    pub async fn call_done(&self, request: Request) -> Result<(), IpcError> {
        let name = request.name();
        match self.call(request).await? {
            Reply::Done => Ok(()),
            reply => Err(IpcError::UnexpectedReply { request: name, reply }),
        }
    }

    /// Hand out the notification stream. Only the first call succeeds.
    pub fn take_notifications(&self) -> Result<NotificationStream, IpcError> {
        let mut slot = self.notifications.lock().unwrap_or_else(PoisonError::into_inner);
        slot.take()
            .map(|receiver| NotificationStream { channel: self.id, receiver })
            .ok_or(IpcError::NotificationsTaken { channel: self.id })
    }
}

/// Receiving half for server notifications
#[derive(Debug)]
pub struct NotificationStream {
    channel: ChannelId,
    receiver: mpsc::UnboundedReceiver<Notification>,
}

impl NotificationStream {
    /// Wait for the next notification. Fails once the server has dropped the channel.
    pub async fn next(&mut self) -> Result<Notification, IpcError> {
        self.receiver
            .recv()
            .await
            .ok_or(IpcError::ChannelClosed { channel: self.channel })
    }
}
