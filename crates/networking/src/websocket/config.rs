//! Connection manager tuning

use std::time::Duration;

/// Automatic reconnects allowed after consecutive unexpected closes
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Delay before each automatic reconnect
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3_000);

/// Interval between keepalive pings while connected
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_millis(30_000);

/// Reconnect and keepalive settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
    pub keepalive_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}
