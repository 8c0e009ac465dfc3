//! Realtime endpoint derived from the REST API base URL

use taskboard_core::{Error, ProjectId, Result};

/// Base URL used when none is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Where project channels live.
///
/// Built from the REST base URL (`https://host/api/v1`); the socket scheme
/// follows the base scheme (`https` → `wss`, `http` → `ws`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    secure: bool,
    host: String,
    path_prefix: String,
}

impl Endpoint {
    /// Parse an API base URL. Accepts `http`, `https`, `ws` and `wss` schemes.
    pub fn parse(base_url: &str) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/');

        let (secure, rest) = if let Some(rest) = base.strip_prefix("https://") {
            (true, rest)
        } else if let Some(rest) = base.strip_prefix("wss://") {
            (true, rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            (false, rest)
        } else if let Some(rest) = base.strip_prefix("ws://") {
            (false, rest)
        } else {
            return Err(Error::InvalidEndpoint(format!(
                "unsupported scheme in '{}'",
                base_url
            )));
        };

        if rest.contains(['?', '#']) {
            return Err(Error::InvalidEndpoint(format!(
                "query or fragment not allowed in '{}'",
                base_url
            )));
        }

        let (host, path_prefix) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        if host.is_empty() {
            return Err(Error::InvalidEndpoint(format!("missing host in '{}'", base_url)));
        }

        Ok(Self {
            secure,
            host: host.to_string(),
            path_prefix: path_prefix.to_string(),
        })
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Channel URL for a project; the token travels as the `token` query parameter
    pub fn channel_url(&self, project: ProjectId, token: &str) -> String {
        format!(
            "{}://{}{}/ws/issues/{}?token={}",
            if self.secure { "wss" } else { "ws" },
            self.host,
            self.path_prefix,
            project,
            urlencoding::encode(token)
        )
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            secure: false,
            host: "localhost:8000".to_string(),
            path_prefix: "/api/v1".to_string(),
        }
    }
}
