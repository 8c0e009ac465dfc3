//! Realtime connection to a project's issue channel
//!
//! A [`ConnectionManager`] keeps at most one channel open for the current
//! target project, reconnects after unexpected closes and sends keepalive
//! pings while connected. It runs as a single tokio task; callers talk to it
//! through a cloneable [`ConnectionHandle`].

mod config;
mod manager;
mod observer;
mod timers;

pub use config::*;
pub use manager::{ConnectionHandle, ConnectionManager, MANUAL_DISCONNECT_REASON};
pub use observer::{ConnectionEvent, NoopObserver, Observer, ObserverCell};
