//! In-process message queues and the shared packet store used by the
//! housekeeping manager.

pub mod store;

pub use store::{LocalStore, StorageManager};

use crate::error::{PoolError, Result};
use crate::housekeeping::message::CommandMessage;
use crate::ids::{MessageQueueId, NO_QUEUE};
use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};
use core::time::Duration;
use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::warn;

/// Queue endpoint of one component.
pub trait MessageQueue: Send {
    fn id(&self) -> MessageQueueId;

    /// Sends `message` with this queue as sender.
    fn send_message(&self, destination: MessageQueueId, message: CommandMessage) -> Result<()>;

    /// Non-blocking receive.
    fn receive_message(&self) -> Option<CommandMessage>;

    fn default_destination(&self) -> Option<MessageQueueId>;
}

#[derive(Debug, Default)]
struct HubInner {
    senders: RwLock<BTreeMap<MessageQueueId, Sender<CommandMessage>>>,
    next_id: AtomicU32,
}

/// Creates queues and routes messages between them by queue id.
#[derive(Debug, Clone, Default)]
pub struct QueueHub {
    inner: Arc<HubInner>,
}

impl QueueHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_queue(&self, depth: usize) -> LocalQueue {
        // Ids start at 1; NO_QUEUE stays reserved.
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = bounded(depth);
        self.inner.senders.write().insert(id, sender);
        LocalQueue {
            id,
            receiver,
            hub: self.clone(),
            default_destination: None,
        }
    }

    fn route(&self, destination: MessageQueueId, message: CommandMessage) -> Result<()> {
        if destination == NO_QUEUE {
            return Err(PoolError::QueueOrDestinationInvalid);
        }
        let senders = self.inner.senders.read();
        let sender = senders
            .get(&destination)
            .ok_or(PoolError::QueueOrDestinationInvalid)?;
        sender.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => {
                warn!("QueueHub::route: queue {} is full", destination);
                PoolError::QueueFull
            }
            TrySendError::Disconnected(_) => PoolError::QueueOrDestinationInvalid,
        })
    }

    fn remove(&self, id: MessageQueueId) {
        self.inner.senders.write().remove(&id);
    }
}

/// Bounded queue created by a [`QueueHub`].
#[derive(Debug)]
pub struct LocalQueue {
    id: MessageQueueId,
    receiver: Receiver<CommandMessage>,
    hub: QueueHub,
    default_destination: Option<MessageQueueId>,
}

impl LocalQueue {
    pub fn set_default_destination(&mut self, destination: MessageQueueId) {
        self.default_destination = Some(destination);
    }

    pub fn receive(&self) -> Option<CommandMessage> {
        self.receiver.try_recv().ok()
    }

    pub fn receive_timeout(&self, timeout: Duration) -> Option<CommandMessage> {
        match self.receiver.recv_timeout(timeout) {
            Ok(message) => Some(message),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl MessageQueue for LocalQueue {
    fn id(&self) -> MessageQueueId {
        self.id
    }

    fn send_message(&self, destination: MessageQueueId, mut message: CommandMessage) -> Result<()> {
        message.sender = self.id;
        self.hub.route(destination, message)
    }

    fn receive_message(&self) -> Option<CommandMessage> {
        self.receive()
    }

    fn default_destination(&self) -> Option<MessageQueueId> {
        self.default_destination
    }
}

impl Drop for LocalQueue {
    fn drop(&mut self) {
        self.hub.remove(self.id);
    }
}
