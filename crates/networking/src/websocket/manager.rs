//! Connection manager task and its handle

use super::observer::{NoopObserver, Observer, ObserverCell};
use super::timers::{KeepaliveTimer, RetryTimer};
use super::ConnectionConfig;
use crate::endpoint::Endpoint;
use crate::transport::{ChannelId, ChannelSender, EventSink, Outbound, Transport, TransportEvent};
use std::sync::Arc;
use taskboard_core::{
    ChannelMessage, CloseCode, CloseEvent, ConnectionState, ConnectionStatus, CredentialProvider,
    ProjectId, CONNECTED,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Close reason sent with a manual disconnect
pub const MANUAL_DISCONNECT_REASON: &str = "Manual disconnect";

enum Command {
    SetTarget(Option<ProjectId>),
    Disconnect,
    Send(ChannelMessage),
}

// ─── Builder ─────────────────────────────────────────────────────────

/// Realtime connection manager, configured before [`spawn`](Self::spawn)
pub struct ConnectionManager {
    endpoint: Endpoint,
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    observer: Arc<dyn Observer>,
}

impl ConnectionManager {
    pub fn new(
        endpoint: Endpoint,
        transport: impl Transport,
        credentials: impl CredentialProvider + 'static,
    ) -> Self {
        Self {
            endpoint,
            config: ConnectionConfig::default(),
            transport: Arc::new(transport),
            credentials: Arc::new(credentials),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Start the manager task. It idles until a target is set and stops when
    /// every handle is dropped or [`ConnectionHandle::shutdown`] is called.
    pub fn spawn(self) -> ConnectionHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::default());
        let observer = Arc::new(ObserverCell::new(self.observer));
        let cancel = CancellationToken::new();

        let task = ManagerTask {
            endpoint: self.endpoint,
            config: self.config,
            transport: self.transport,
            credentials: self.credentials,
            observer: observer.clone(),
            commands: commands_rx,
            events_tx,
            events: events_rx,
            status: status_tx,
            target: None,
            channel: None,
            retired: None,
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            next_channel_id: 0,
            retry: RetryTimer::default(),
            keepalive: KeepaliveTimer::new(self.config.keepalive_interval),
        };
        tokio::spawn(task.run(cancel.clone()));

        ConnectionHandle {
            commands: commands_tx,
            status: status_rx,
            observer,
            cancel,
        }
    }
}

// ─── Handle ──────────────────────────────────────────────────────────

/// Cloneable handle to a running connection manager.
///
/// Operations are queued to the manager task and never fail; once the
/// manager has stopped they are silently ignored.
#[derive(Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    observer: Arc<ObserverCell>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Connect to `target`, or disconnect and stay idle for `None`
    pub fn set_target(&self, target: Option<ProjectId>) {
        self.command(Command::SetTarget(target));
    }

    /// Close the channel and cancel any pending reconnect
    pub fn disconnect(&self) {
        self.command(Command::Disconnect);
    }

    /// Transmit a message; dropped unless currently connected
    pub fn send(&self, message: ChannelMessage) {
        self.command(Command::Send(message));
    }

    /// Swap the observer in place
    pub fn set_observer(&self, observer: Arc<dyn Observer>) {
        self.observer.replace(observer);
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> ConnectionState {
        self.status().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Watch status changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Disconnect and stop the manager task
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    fn command(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Connection manager stopped, command ignored");
        }
    }
}

// ─── Task ────────────────────────────────────────────────────────────

struct LiveChannel {
    id: ChannelId,
    project: ProjectId,
    sender: ChannelSender,
}

struct ManagerTask {
    endpoint: Endpoint,
    config: ConnectionConfig,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    observer: Arc<ObserverCell>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<(ChannelId, TransportEvent)>,
    events: mpsc::UnboundedReceiver<(ChannelId, TransportEvent)>,
    status: watch::Sender<ConnectionStatus>,
    target: Option<ProjectId>,
    /// Present exactly while `Connecting` or `Connected`
    channel: Option<LiveChannel>,
    /// Last channel torn down by a manual disconnect
    retired: Option<ChannelId>,
    state: ConnectionState,
    reconnect_attempts: u32,
    next_channel_id: u64,
    retry: RetryTimer,
    keepalive: KeepaliveTimer,
}

impl ManagerTask {
    async fn run(mut self, cancel: CancellationToken) {
        debug!("Connection manager started");

        loop {
            // Commands win ties so a teardown always cancels timers before they fire
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.disconnect();
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        self.disconnect();
                        break;
                    }
                },
                Some((id, event)) = self.events.recv() => self.handle_event(id, event),
                () = self.retry.fired() => {
                    debug!("Reconnect timer fired");
                    self.connect();
                }
                () = self.keepalive.tick() => {
                    self.transmit(&ChannelMessage::ping());
                }
            }
        }

        debug!("Connection manager stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetTarget(None) => {
                self.disconnect();
                self.target = None;
                self.publish();
            }
            Command::SetTarget(Some(project)) => {
                if self.target == Some(project) && self.channel.is_some() {
                    debug!("Already connected/connecting to project {}, skipping", project);
                    return;
                }
                if self.target == Some(project) && self.retry.is_pending() {
                    debug!("Reconnect to project {} already scheduled, skipping", project);
                    return;
                }
                self.disconnect();
                self.target = Some(project);
                self.reconnect_attempts = 0;
                self.publish();
                self.connect();
            }
            Command::Disconnect => self.disconnect(),
            Command::Send(message) => self.transmit(&message),
        }
    }

    fn connect(&mut self) {
        let Some(project) = self.target else {
            return;
        };

        if self.channel.is_some() {
            debug!("Channel for project {} already open or opening, skipping", project);
            return;
        }

        let Some(token) = self.credentials.credential() else {
            error!("No authentication token found, not connecting to project {}", project);
            self.publish();
            return;
        };

        debug_assert!(!self.retry.is_pending());
        self.next_channel_id += 1;
        let id = ChannelId(self.next_channel_id);
        let url = self.endpoint.channel_url(project, &token);

        info!("Opening {} for project {}", id, project);
        let sender = self.transport.open(&url, EventSink::new(id, self.events_tx.clone()));
        self.channel = Some(LiveChannel { id, project, sender });
        self.retired = None;
        self.set_state(ConnectionState::Connecting);
    }

    /// Idempotent teardown. The handle is cleared before the close is
    /// requested so the transport's close event reads as manual.
    fn disconnect(&mut self) {
        self.retry.cancel();
        self.keepalive.cancel();

        if let Some(channel) = self.channel.take() {
            info!("Disconnecting {} from project {}", channel.id, channel.project);
            self.retired = Some(channel.id);
            let close = CloseEvent::new(CloseCode::NORMAL, MANUAL_DISCONNECT_REASON);
            if channel.sender.send(Outbound::Close(close)).is_err() {
                debug!("{} already finished", channel.id);
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    fn transmit(&self, message: &ChannelMessage) {
        let channel = match (&self.channel, self.state) {
            (Some(channel), ConnectionState::Connected) => channel,
            _ => {
                debug!("Not connected, dropping outbound '{}' message", message.kind);
                return;
            }
        };

        match message.to_json() {
            Ok(json) => {
                if channel.sender.send(Outbound::Text(json)).is_err() {
                    debug!("{} finished, outbound '{}' dropped", channel.id, message.kind);
                }
            }
            Err(e) => warn!("Failed to serialize outbound '{}' message: {}", message.kind, e),
        }
    }

    fn handle_event(&mut self, id: ChannelId, event: TransportEvent) {
        let live = self
            .channel
            .as_ref()
            .filter(|channel| channel.id == id)
            .map(|channel| channel.project);
        let Some(project) = live else {
            if let TransportEvent::Closed(close) = event {
                self.handle_retired_close(id, close);
            } else {
                debug!("Ignoring event from retired {}", id);
            }
            return;
        };

        match event {
            TransportEvent::Opened => {
                info!("Connected to project {}", project);
                self.reconnect_attempts = 0;
                self.keepalive.start();
                self.set_state(ConnectionState::Connected);
                self.observer.current().on_open(project);
            }
            TransportEvent::Message(text) => self.handle_message(project, &text),
            TransportEvent::Error(err) => {
                warn!("Channel error for project {}: {}", project, err);
                self.observer.current().on_error(&err);
            }
            TransportEvent::Closed(close) => self.handle_close(project, close),
        }
    }

    fn handle_message(&self, project: ProjectId, text: &str) {
        let message = match ChannelMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping malformed message for project {}: {}", project, e);
                return;
            }
        };

        if message.is_internal() {
            if message.kind == CONNECTED {
                let greeting = message
                    .payload
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                debug!("Handshake acknowledged for project {}: {}", project, greeting);
            }
            return;
        }

        debug!("Forwarding '{}' message for project {}", message.kind, project);
        self.observer.current().on_message(message);
    }

    /// Status is final (retry scheduled or not) by the time observers hear of the close
    fn handle_close(&mut self, project: ProjectId, close: CloseEvent) {
        self.channel = None;
        self.keepalive.cancel();
        info!(
            "Disconnected from project {} (code {}, reason '{}')",
            project, close.code, close.reason
        );

        if close.code.is_retryable() {
            if self.reconnect_attempts < self.config.max_reconnect_attempts {
                self.reconnect_attempts += 1;
                info!(
                    "Reconnecting to project {} in {:?} (attempt {}/{})",
                    project,
                    self.config.reconnect_delay,
                    self.reconnect_attempts,
                    self.config.max_reconnect_attempts
                );
                self.retry.schedule(self.config.reconnect_delay);
            } else {
                error!("Max reconnection attempts reached for project {}", project);
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.observer.current().on_close(&close);
    }

    /// Close of a channel that is no longer live: never retried. Observers
    /// hear about it only when it ends a manual disconnect with nothing
    /// opened since.
    fn handle_retired_close(&mut self, id: ChannelId, close: CloseEvent) {
        debug!("{} finished after teardown (code {})", id, close.code);
        if self.retired == Some(id) && self.channel.is_none() {
            self.retired = None;
            self.observer.current().on_close(&close);
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        debug_assert_eq!(self.keepalive.is_active(), state == ConnectionState::Connected);
        self.state = state;
        self.publish();
    }

    fn publish(&self) {
        self.status.send_replace(ConnectionStatus {
            state: self.state,
            target: self.target,
            reconnect_attempts: self.reconnect_attempts,
            reconnect_pending: self.retry.is_pending(),
        });
    }
}
