//! Error types and Result alias for the Taskboard client

use thiserror::Error;

/// Main error type for the Taskboard client
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid project id: {0}")]
    InvalidProjectId(String),
}

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidData(err.to_string())
    }
}
