//! Persistent per-call message stream.
//!
//! One ChannelHandle per call identifier. A background reader task
//! decodes each inbound frame and delivers it over an in-process
//! channel in server-send order; the consumer sees decoded events,
//! transport faults, and the close, each exactly once in sequence.
//!
//! There is no automatic reconnect. Once the stream reports a
//! transport error or a close, the handle is spent; reconnection
//! policy belongs to the caller.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, warn};

use crate::domain::events::{decode_message, ChannelEvent};

/// Connection establishment timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the reader task to wind down on close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader-to-consumer buffer depth
const DELIVERY_BUFFER: usize = 256;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Failure to establish the channel
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Failed to connect to channel: {0}")]
    Connect(String),

    #[error("Channel connection timed out after {}s", CONNECT_TIMEOUT.as_secs())]
    ConnectTimeout,
}

/// What the stream delivers to its consumer, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// A decoded server event (including decode failures surfaced as
    /// `ChannelEvent::Error`)
    Event(ChannelEvent),

    /// The connection failed; terminal
    TransportError(String),

    /// Clean or server-initiated close; terminal
    Closed,
}

/// Opens channel subscriptions
pub struct ChannelClient;

impl ChannelClient {
    /// Connect to a per-call channel URL and start reading.
    pub async fn open(url: &str) -> Result<ChannelHandle, StreamError> {
        debug!(%url, "Opening channel");

        let connect = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url)).await;
        let (ws_stream, _response) = match connect {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => return Err(StreamError::Connect(e.to_string())),
            Err(_) => return Err(StreamError::ConnectTimeout),
        };

        let (sink, stream) = ws_stream.split();
        let sink = Arc::new(Mutex::new(sink));

        let (tx, rx) = mpsc::channel(DELIVERY_BUFFER);
        let reader = tokio::spawn(reader_loop(stream, tx));

        Ok(ChannelHandle {
            events: rx,
            sink,
            reader: Some(reader),
        })
    }
}

/// One open channel subscription
pub struct ChannelHandle {
    events: mpsc::Receiver<ChannelMessage>,
    sink: Arc<Mutex<WsSink>>,
    reader: Option<JoinHandle<()>>,
}

impl ChannelHandle {
    /// Next message in arrival order; `None` once the stream has
    /// delivered its terminal message and drained
    pub async fn recv(&mut self) -> Option<ChannelMessage> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<ChannelMessage> {
        self.events.try_recv().ok()
    }

    /// Send a close frame and wind down the reader task.
    pub async fn close(&mut self) {
        {
            let mut sink = self.sink.lock().await;
            if let Err(e) = sink.send(Message::Close(None)).await {
                debug!("Error sending close frame: {e}");
            }
            if let Err(e) = sink.close().await {
                debug!("Error closing channel sink: {e}");
            }
        }

        if let Some(handle) = self.reader.take() {
            let abort = handle.abort_handle();
            match tokio::time::timeout(CLOSE_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!("Channel reader finished cleanly"),
                Ok(Err(e)) => warn!("Channel reader task failed: {e}"),
                Err(_) => {
                    warn!("Channel reader did not stop in time, aborting");
                    abort.abort();
                }
            }
        }
    }
}

/// Reads frames until the connection ends, forwarding each decoded
/// message in order and finishing with exactly one terminal message.
async fn reader_loop(mut stream: WsStream, tx: mpsc::Sender<ChannelMessage>) {
    let mut terminal = ChannelMessage::Closed;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                if let Some(event) = decode_message(&text) {
                    if tx.send(ChannelMessage::Event(event)).await.is_err() {
                        // Consumer dropped the handle
                        return;
                    }
                }
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "Channel closed by server");
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Pings are answered by tungstenite; binary frames are
                // not part of this protocol.
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                error!("Channel transport error: {e}");
                terminal = ChannelMessage::TransportError(e.to_string());
                break;
            }
        }
    }

    let _ = tx.send(terminal).await;
    debug!("Channel reader loop ended");
}
