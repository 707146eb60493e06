//! Change notification.
//!
//! Every committed write publishes a [`ChangeEvent`]. Events carry no document:
//! listeners re-read the store and must treat what they read as already stale.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;

/// Default number of buffered events per listener before it starts lagging.
pub const DEFAULT_CAPACITY: usize = 64;

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// Written through this process's store
    Local,
    /// Observed in storage, written by another process
    External,
}

/// A change to one storage key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeEvent {
    pub key: String,
    pub revision: i64,
    pub origin: ChangeOrigin,
}

/// Fire-and-forget broadcaster of change events.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Having no listeners is fine.
    pub fn notify(&self, event: ChangeEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Change published with no listeners");
        }
    }

    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Run `handler` for every future event until the returned handle is dropped.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn on_change<F>(&self, handler: F) -> ListenerHandle
    where
        F: Fn(ChangeEvent) + Send + 'static,
    {
        let mut subscription = self.subscribe();
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                handler(event);
            }
        });
        ListenerHandle { task }
    }

    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A stream of change events for one listener.
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once the notifier is gone.
    ///
    /// A lagging listener skips the events it missed; since events carry no
    /// payload, the next one still tells it to re-read.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Change listener lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Change listener lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Keeps an `on_change` listener alive. Dropping it unsubscribes.
pub struct ListenerHandle {
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {}
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
