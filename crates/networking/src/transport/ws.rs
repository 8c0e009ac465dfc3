//! WebSocket transport over tokio-tungstenite

use super::{ChannelSender, EventSink, Outbound, Transport, TransportEvent};
use futures::{SinkExt, StreamExt};
use std::sync::Once;
use std::time::Duration;
use taskboard_core::{CloseCode, CloseEvent};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// How long to wait for the server to answer our close frame
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport that opens real WebSocket connections.
///
/// Each channel runs in its own tokio task; `open` must be called from
/// inside a tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        WsTransport
    }
}

impl Transport for WsTransport {
    fn open(&self, url: &str, events: EventSink) -> ChannelSender {
        install_crypto_provider();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_channel(url.to_string(), events, rx));
        tx
    }
}

static CRYPTO_PROVIDER: Once = Once::new();

/// rustls needs a process-wide provider before the first `wss://` handshake
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        // Err means the embedding application already installed one
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

async fn run_channel(url: String, events: EventSink, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    let id = events.id();

    // A close requested before the handshake finishes aborts the attempt
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => Some(result),
        _ = outbound.recv() => None,
    };

    let ws = match connected {
        Some(Ok((ws, _response))) => ws,
        Some(Err(e)) => {
            debug!("{} failed to connect: {}", id, e);
            events.emit(TransportEvent::Error(e.to_string()));
            events.emit(TransportEvent::Closed(CloseEvent::new(
                CloseCode::ABNORMAL,
                "connection failed",
            )));
            return;
        }
        None => {
            debug!("{} closed before the handshake finished", id);
            events.emit(TransportEvent::Closed(CloseEvent::new(
                CloseCode::ABNORMAL,
                "closed before open",
            )));
            return;
        }
    };

    events.emit(TransportEvent::Opened);
    let (mut sink, mut stream) = ws.split();
    let mut server_close: Option<CloseEvent> = None;

    loop {
        tokio::select! {
            request = outbound.recv() => {
                let close = match request {
                    Some(Outbound::Text(text)) => {
                        if server_close.is_some() {
                            debug!("{} is closing, outbound frame dropped", id);
                            continue;
                        }
                        if let Err(e) = sink.send(Message::text(text)).await {
                            events.emit(TransportEvent::Error(e.to_string()));
                        }
                        continue;
                    }
                    Some(Outbound::Close(close)) => close,
                    // Manager dropped the channel without asking
                    None => CloseEvent::new(CloseCode::NORMAL, ""),
                };

                let frame = CloseFrame {
                    code: WsCloseCode::from(close.code.as_u16()),
                    reason: close.reason.clone().into(),
                };
                if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                    debug!("{} close frame not sent: {}", id, e);
                }

                // Let the server echo the close so the socket shuts down cleanly
                let drain = async { while let Some(Ok(_)) = stream.next().await {} };
                if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, drain).await.is_err() {
                    debug!("{} close handshake timed out", id);
                }

                events.emit(TransportEvent::Closed(close));
                return;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    events.emit(TransportEvent::Message(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        events.emit(TransportEvent::Message(text));
                    }
                    Err(_) => warn!("{} dropped non-UTF-8 binary frame ({} bytes)", id, bytes.len()),
                },
                Some(Ok(Message::Close(frame))) => {
                    let close = match frame {
                        Some(frame) => CloseEvent::new(u16::from(frame.code), frame.reason.as_str()),
                        None => CloseEvent::new(CloseCode::NO_STATUS, ""),
                    };
                    debug!("{} server sent close {}", id, close.code);
                    // Keep polling so tungstenite can flush its close reply
                    server_close = Some(close);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let close = match server_close.take() {
                        Some(close) => close,
                        None => {
                            events.emit(TransportEvent::Error(e.to_string()));
                            CloseEvent::new(CloseCode::ABNORMAL, e.to_string())
                        }
                    };
                    events.emit(TransportEvent::Closed(close));
                    return;
                }
                None => {
                    let close = server_close
                        .take()
                        .unwrap_or_else(|| CloseEvent::new(CloseCode::ABNORMAL, "connection lost"));
                    events.emit(TransportEvent::Closed(close));
                    return;
                }
            },
        }
    }
}
