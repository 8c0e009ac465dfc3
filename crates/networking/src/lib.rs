//! Taskboard Networking - Realtime project channel and its transport

pub mod endpoint;
pub mod transport;
pub mod websocket;

pub use endpoint::Endpoint;
pub use transport::{Transport, WsTransport};
pub use websocket::{ConnectionConfig, ConnectionEvent, ConnectionHandle, ConnectionManager, Observer};
