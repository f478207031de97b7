//! Error observers.
//!
//! Delivery anomalies never propagate to the caller of `track`. They are
//! handed to the observers registered on the tracker's `error` channel. With
//! no observers registered, anomalies are dropped silently.
//!
//! # Thread Safety
//!
//! `ErrorObservers` is shared between the tracker and its in-flight requests
//! through an `Arc`. The handler list sits behind a `parking_lot::RwLock`;
//! notification clones the list and calls handlers after releasing the lock,
//! so a handler may register or remove observers itself.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

/// What went wrong with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorNotification {
    /// Endpoint answered with a status outside the success window.
    Status(u16),
    /// Request never completed; carries the transport's message.
    Transport(String),
}

impl ErrorNotification {
    pub fn status(&self) -> Option<u16> {
        match self {
            ErrorNotification::Status(code) => Some(*code),
            ErrorNotification::Transport(_) => None,
        }
    }
}

impl fmt::Display for ErrorNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorNotification::Status(code) => write!(f, "{}", code),
            ErrorNotification::Transport(message) => f.write_str(message),
        }
    }
}

/// Handle returned on registration, used to remove the observer again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Handler = Arc<dyn Fn(&ErrorNotification) + Send + Sync>;

/// Registry of error handlers, notified in registration order.
#[derive(Default)]
pub struct ErrorObservers {
    handlers: RwLock<Vec<(ObserverId, Handler)>>,
    next_id: AtomicU64,
}

impl ErrorObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler.
    pub fn register<F>(&self, handler: F) -> ObserverId
    where
        F: Fn(&ErrorNotification) + Send + Sync + 'static,
    {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Registers a handler forwarding notifications into a channel.
    ///
    /// The observer stays registered after the receiver is dropped; sends to
    /// a closed channel are ignored.
    pub fn subscribe(&self) -> (ObserverId, mpsc::UnboundedReceiver<ErrorNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.register(move |notification| {
            let _ = tx.send(notification.clone());
        });
        (id, rx)
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        handlers.len() != before
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Calls every registered handler once with the notification.
    pub fn notify(&self, notification: &ErrorNotification) {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in handlers {
            handler(notification);
        }
    }
}

impl fmt::Debug for ErrorObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorObservers")
            .field("count", &self.len())
            .finish()
    }
}
