//! Transport seam between the connection manager and a socket implementation
//!
//! Opening a channel never blocks: the transport hands back an outbound
//! sender immediately and reports everything else (open, frames, errors,
//! the final close) as [`TransportEvent`]s tagged with the channel id.

mod ws;

pub use ws::WsTransport;

use std::fmt;
use taskboard_core::CloseEvent;
use tokio::sync::mpsc;

/// Identifies one opened channel for the lifetime of a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub u64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

/// Lifecycle events reported by a channel, in delivery order:
/// `Opened`, then messages and errors, then exactly one `Closed`.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Error(String),
    Closed(CloseEvent),
}

/// Frames the manager asks a channel to write
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    /// Send a close frame with this code and reason, then finish the channel
    Close(CloseEvent),
}

/// Outbound half of an opened channel
pub type ChannelSender = mpsc::UnboundedSender<Outbound>;

/// Event queue shared by every channel of one manager
pub type EventQueue = mpsc::UnboundedSender<(ChannelId, TransportEvent)>;

/// Where a channel reports its lifecycle
#[derive(Debug, Clone)]
pub struct EventSink {
    id: ChannelId,
    tx: EventQueue,
}

impl EventSink {
    pub fn new(id: ChannelId, tx: EventQueue) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Report an event. Returns false once the manager has gone away.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.id, event)).is_ok()
    }
}

/// Opens realtime channels
pub trait Transport: Send + Sync + 'static {
    fn open(&self, url: &str, events: EventSink) -> ChannelSender;
}
