//! Shared type definitions and newtypes

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Project identifier (the subscription target of a realtime channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ProjectId)
            .map_err(|_| Error::InvalidProjectId(s.to_string()))
    }
}

/// Realtime connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    /// True while a channel handle exists (opening or open)
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

/// WebSocket close code (RFC 6455 section 7.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure, used for manual disconnects
    pub const NORMAL: CloseCode = CloseCode(1000);
    /// Close frame arrived without a status code
    pub const NO_STATUS: CloseCode = CloseCode(1005);
    /// Connection dropped without a close frame
    pub const ABNORMAL: CloseCode = CloseCode(1006);
    /// Policy violation, the server's answer to a rejected token
    pub const POLICY_VIOLATION: CloseCode = CloseCode(1008);

    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Whether a close with this code may be followed by an automatic reconnect
    pub fn is_retryable(&self) -> bool {
        *self != CloseCode::NORMAL && *self != CloseCode::POLICY_VIOLATION
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        CloseCode(code)
    }
}

/// Close notification delivered to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseEvent {
    pub code: CloseCode,
    pub reason: String,
}

impl CloseEvent {
    pub fn new(code: impl Into<CloseCode>, reason: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
        }
    }
}

/// Snapshot of a connection manager, published on every change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub target: Option<ProjectId>,
    pub reconnect_attempts: u32,
    /// An automatic reconnect is scheduled
    pub reconnect_pending: bool,
}
