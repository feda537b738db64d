//! WebSocket chat client — the explicitly owned connection handle.
//!
//! DESIGN
//! ======
//! `ChatClient` opens one WebSocket under the fixed chat path and owns it for
//! its lifetime. Two pump tasks bridge the socket and the caller:
//! - outbound queue → socket sink, so `emit` never blocks the event loop
//! - socket stream → inbound queue, drained by the caller in arrival order
//!
//! The handle never touches view state; decoded events are delivered on the
//! queue and applied by the caller. `close` aborts both pumps without
//! awaiting in-flight work and empties the inbound queue, so no event is
//! delivered after disposal. A closed client is terminal — there is no
//! reconnect path.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{info, warn};

use crate::event::{Envelope, decode_event, encode_event};

/// Fixed sub-path distinguishing the chat channel from anything else
/// multiplexed on the endpoint.
pub const CHAT_PATH: &str = "/_chat";

/// Inbound queue depth before the socket pump applies backpressure.
const INBOUND_QUEUE_DEPTH: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Error returned by [`ChatClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("connection closed")]
    Closed,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to one open chat channel.
///
/// At most one live handle exists per view; dropping it closes the channel.
#[derive(Debug)]
pub struct ChatClient {
    outbound: mpsc::UnboundedSender<Envelope>,
    inbound: mpsc::Receiver<Envelope>,
    connected: Arc<AtomicBool>,
    send_pump: JoinHandle<()>,
    recv_pump: JoinHandle<()>,
}

impl ChatClient {
    /// Open the chat channel under [`CHAT_PATH`] on `base_url`.
    ///
    /// A successful open is logged; there is no handshake beyond the
    /// WebSocket upgrade and no state is exchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidBaseUrl`] for a base URL without an
    /// `http://` or `https://` scheme, and [`ClientError::Connect`] when the
    /// WebSocket handshake fails.
    pub async fn connect(base_url: &str) -> Result<Self, ClientError> {
        let url = ws_url(base_url)?;
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|error| ClientError::Connect(Box::new(error)))?;

        info!(%url, "connected to chat server");

        let (sink, stream) = stream.split();
        let connected = Arc::new(AtomicBool::new(true));
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

        let send_pump = tokio::spawn(pump_outbound(out_rx, sink, Arc::clone(&connected)));
        let recv_pump = tokio::spawn(pump_inbound(stream, in_tx, Arc::clone(&connected)));

        Ok(Self {
            outbound: out_tx,
            inbound: in_rx,
            connected,
            send_pump,
            recv_pump,
        })
    }

    /// Whether the underlying transport is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queue one outbound event for sending.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Closed`] when the connection has closed.
    pub fn emit(&self, event: &Envelope) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::Closed);
        }
        self.outbound
            .send(event.clone())
            .map_err(|_| ClientError::Closed)
    }

    /// Next inbound event in arrival order.
    ///
    /// Returns `None` once the connection has closed and the queue has
    /// drained. Terminal for the handle.
    pub async fn next_event(&mut self) -> Option<Envelope> {
        self.inbound.recv().await
    }

    /// Close the connection unconditionally.
    ///
    /// Both pumps are aborted without awaiting in-flight work and the
    /// inbound queue is emptied, so no event is delivered after this
    /// returns.
    pub fn close(&mut self) {
        self.connected.store(false, Ordering::SeqCst);
        self.send_pump.abort();
        self.recv_pump.abort();
        self.inbound.close();
        while self.inbound.try_recv().is_ok() {}
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// PUMPS
// =============================================================================

/// Forward queued outbound events to the socket until either side closes.
async fn pump_outbound(
    mut queue: mpsc::UnboundedReceiver<Envelope>,
    mut sink: SplitSink<WsStream, Message>,
    connected: Arc<AtomicBool>,
) {
    while let Some(event) = queue.recv().await {
        let json = encode_event(&event);
        if sink.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
    connected.store(false, Ordering::SeqCst);
}

/// Deliver decoded inbound events to the queue until the socket closes.
///
/// Text that fails to decode is dropped with a diagnostic; binary and
/// control messages are ignored.
async fn pump_inbound(
    mut stream: SplitStream<WsStream>,
    queue: mpsc::Sender<Envelope>,
    connected: Arc<AtomicBool>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match decode_event(&text) {
                Ok(event) => {
                    if queue.send(event).await.is_err() {
                        break;
                    }
                }
                Err(error) => warn!(error = %error, "dropping undecodable event"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                warn!(error = %error, "websocket receive error");
                break;
            }
        }
    }
    connected.store(false, Ordering::SeqCst);
}

// =============================================================================
// HELPERS
// =============================================================================

/// Map an `http(s)` base URL to the `ws(s)` URL for the chat channel.
fn ws_url(base_url: &str) -> Result<String, ClientError> {
    let base = base_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("http://") {
        return Ok(format!("ws://{rest}{CHAT_PATH}"));
    }
    if let Some(rest) = base.strip_prefix("https://") {
        return Ok(format!("wss://{rest}{CHAT_PATH}"));
    }

    Err(ClientError::InvalidBaseUrl(base_url.to_owned()))
}
