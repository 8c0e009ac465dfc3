//! Subcommand implementations

pub mod token;
pub mod watch;
