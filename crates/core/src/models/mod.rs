//! Data models for Taskboard entities

mod auth;
mod issue;
mod message;

pub use auth::*;
pub use issue::*;
pub use message::*;
