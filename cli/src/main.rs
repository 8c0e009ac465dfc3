//! Taskboard CLI - Realtime issue feed and token management

mod commands;
mod state;

use clap::{Parser, Subcommand};
use commands::token::TokenAction;
use state::AppState;
use std::path::PathBuf;
use taskboard_core::ProjectId;
use taskboard_networking::endpoint::DEFAULT_API_BASE_URL;
use taskboard_networking::Endpoint;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "taskboard", version, about = "Realtime issue feed for Taskboard projects")]
struct Cli {
    /// REST API base URL; the realtime channel is served under it
    #[arg(long, env = "TASKBOARD_API_BASE_URL", default_value = DEFAULT_API_BASE_URL, global = true)]
    api_base_url: String,

    /// Directory holding the local settings database
    #[arg(long, env = "TASKBOARD_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream realtime events of a project as JSON lines
    Watch {
        #[arg(long, short)]
        project: ProjectId,
    },
    /// Manage the stored access token
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries the message stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard=info,taskboard_networking=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let data_dir = cli.data_dir.unwrap_or_else(state::default_data_dir);
    let state = AppState::open(data_dir).await?;
    tracing::debug!("Using data directory {}", state.data_dir.display());

    match cli.command {
        Command::Watch { project } => {
            let endpoint = Endpoint::parse(&cli.api_base_url)?;
            commands::watch::run(endpoint, state.tokens.clone(), project).await
        }
        Command::Token { action } => commands::token::run(&state.tokens, action).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from([
            "taskboard",
            "--api-base-url",
            "https://board.example.com/api/v1",
            "watch",
            "--project",
            "42",
        ])
        .unwrap();

        assert_eq!(cli.api_base_url, "https://board.example.com/api/v1");
        assert!(matches!(cli.command, Command::Watch { project } if project == ProjectId(42)));
    }

    #[test]
    fn test_parse_rejects_bad_project() {
        assert!(Cli::try_parse_from(["taskboard", "watch", "--project", "abc"]).is_err());
    }

    #[test]
    fn test_parse_token_set() {
        let cli = Cli::try_parse_from(["taskboard", "token", "set", "abc", "--user-json", "{}"])
            .unwrap();

        match cli.command {
            Command::Token {
                action: TokenAction::Set { token, user_json },
            } => {
                assert_eq!(token, "abc");
                assert_eq!(user_json.as_deref(), Some("{}"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
