//! Observer callbacks for connection lifecycle and forwarded messages

use std::sync::{Arc, PoisonError, RwLock};
use taskboard_core::{ChannelMessage, CloseEvent, ProjectId};
use tokio::sync::mpsc;

/// Receives connection notifications.
///
/// Callbacks run on the manager task, so they should return quickly;
/// hand work off to another task if it may block.
pub trait Observer: Send + Sync {
    fn on_open(&self, _project: ProjectId) {}

    /// Any inbound message except `pong` and `connected`, unchanged
    fn on_message(&self, _message: ChannelMessage) {}

    /// Transport error; a close notification always follows separately
    fn on_error(&self, _error: &str) {}

    fn on_close(&self, _close: &CloseEvent) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {}

/// Observer notifications as values, for consumers that prefer a channel
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened(ProjectId),
    Message(ChannelMessage),
    Error(String),
    Closed(CloseEvent),
}

impl Observer for mpsc::UnboundedSender<ConnectionEvent> {
    fn on_open(&self, project: ProjectId) {
        let _ = self.send(ConnectionEvent::Opened(project));
    }

    fn on_message(&self, message: ChannelMessage) {
        let _ = self.send(ConnectionEvent::Message(message));
    }

    fn on_error(&self, error: &str) {
        let _ = self.send(ConnectionEvent::Error(error.to_string()));
    }

    fn on_close(&self, close: &CloseEvent) {
        let _ = self.send(ConnectionEvent::Closed(close.clone()));
    }
}

/// Replaceable slot holding the current observer.
///
/// The manager reads through the cell on every notification, so a
/// replacement takes effect for the next event without reopening anything.
pub struct ObserverCell {
    current: RwLock<Arc<dyn Observer>>,
}

impl ObserverCell {
    pub fn new(observer: Arc<dyn Observer>) -> Self {
        Self {
            current: RwLock::new(observer),
        }
    }

    /// A panicking observer never blocks replacement
    pub fn replace(&self, observer: Arc<dyn Observer>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = observer;
    }

    pub fn current(&self) -> Arc<dyn Observer> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_after_poisoned_lock() {
        let cell = Arc::new(ObserverCell::new(Arc::new(NoopObserver)));
        let poisoner = cell.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.current.write().unwrap();
            panic!("observer panicked");
        })
        .join();
        assert!(cell.current.is_poisoned());

        let (tx, mut rx) = mpsc::unbounded_channel();
        cell.replace(Arc::new(tx));
        cell.current().on_open(ProjectId(5));

        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::Opened(ProjectId(5)));
    }
}
