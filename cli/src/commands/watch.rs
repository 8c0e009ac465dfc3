//! `taskboard watch`: stream a project's realtime channel to stdout
//!
//! Forwarded messages are printed as JSON lines. Lines read from stdin are
//! sent through the channel while it is connected.

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use std::time::Duration;
use taskboard_core::{ChannelMessage, CloseCode, ConnectionState, CredentialProvider, ProjectId};
use taskboard_networking::{
    ConnectionEvent, ConnectionHandle, ConnectionManager, Endpoint, WsTransport,
};
use taskboard_persistence::TokenStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long to wait for the server to acknowledge our close frame
const CLOSE_GRACE: Duration = Duration::from_secs(2);

pub async fn run(endpoint: Endpoint, tokens: Arc<TokenStore>, project: ProjectId) -> Result<()> {
    if tokens.credential().is_none() {
        bail!("No access token stored, run `taskboard token set <token>` first");
    }

    let (events_tx, mut events) = mpsc::unbounded_channel();
    let handle = ConnectionManager::new(endpoint, WsTransport::new(), tokens)
        .observer(Arc::new(events_tx))
        .spawn();
    handle.set_target(Some(project));

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, disconnecting from project {}", project);
                break Ok(());
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break Err(anyhow!("Connection manager stopped unexpectedly"));
                };
                if let Some(outcome) = report(&handle, event)? {
                    break outcome;
                }
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => forward(&handle, &line),
                Ok(None) => {
                    debug!("stdin closed, no more outbound messages");
                    stdin_open = false;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    };

    if handle.state().is_active() {
        handle.disconnect();
        let closed = tokio::time::timeout(CLOSE_GRACE, async {
            while let Some(event) = events.recv().await {
                if matches!(event, ConnectionEvent::Closed(_)) {
                    break;
                }
            }
        })
        .await;
        if closed.is_err() {
            debug!("Server did not acknowledge the close within {:?}", CLOSE_GRACE);
        }
    }
    handle.shutdown();

    outcome
}

/// Print one observer notification.
///
/// Returns `Some(outcome)` once the manager has settled for good: the
/// server closed with a non-retryable code or reconnects are exhausted.
fn report(handle: &ConnectionHandle, event: ConnectionEvent) -> Result<Option<Result<()>>> {
    match event {
        ConnectionEvent::Opened(project) => info!("Listening on project {}", project),
        ConnectionEvent::Message(message) => {
            if let Some(issue) = message.issue_event() {
                match issue.issue_id() {
                    Some(id) => info!("Issue #{} {}", id, issue.label()),
                    None => info!("Issue {}", issue.label()),
                }
            }
            println!("{}", message.to_json()?);
        }
        ConnectionEvent::Error(error) => warn!("Channel error: {}", error),
        ConnectionEvent::Closed(close) => {
            let status = handle.status();
            if status.state != ConnectionState::Disconnected || status.reconnect_pending {
                return Ok(None);
            }
            let outcome = match close.code {
                CloseCode::NORMAL => Ok(()),
                CloseCode::POLICY_VIOLATION => Err(anyhow!(
                    "Server rejected the access token: {}",
                    close.reason
                )),
                code => Err(anyhow!(
                    "Gave up after {} reconnect attempts (last close code {})",
                    status.reconnect_attempts,
                    code
                )),
            };
            return Ok(Some(outcome));
        }
    }
    Ok(None)
}

/// Send one stdin line as a channel message
fn forward(handle: &ConnectionHandle, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    match ChannelMessage::parse(line) {
        Ok(message) => {
            if !handle.is_connected() {
                warn!("Not connected, dropping '{}' message", message.kind);
            }
            handle.send(message);
        }
        Err(e) => warn!("Ignoring input line: {}", e),
    }
}
