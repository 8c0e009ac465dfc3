//! Taskboard Persistence - Settings database and credential store

pub mod sqlite;
pub mod store;

pub use sqlite::Database;
pub use store::{TokenStore, ACCESS_TOKEN_KEY, AUTH_STATE_KEY};
