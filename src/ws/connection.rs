//! WebSocket connection with tokio-tungstenite.
//!
//! The sink and stream halves are locked independently, so one task can sit
//! in [`WebSocket::recv`] while others send.

use super::message::{CloseCode, CloseFrame, Message};
use crate::base::error::RuntimeError;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite, MaybeTlsStream, WebSocketStream};
use url::Url;

/// Type alias for the WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket connection.
#[derive(Debug)]
pub struct WebSocket {
    sink: Arc<Mutex<SplitSink<WsStream, tungstenite::Message>>>,
    stream: Arc<Mutex<SplitStream<WsStream>>>,
}

impl WebSocket {
    /// Connect to a WebSocket server with a single attempt.
    pub async fn connect(url: &str) -> Result<Self, RuntimeError> {
        let url = parse_ws_url(url)?;

        let (ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            tracing::debug!("WebSocket connect error: {:?}", e);
            RuntimeError::ConnectionFailed(e.to_string())
        })?;

        let (sink, stream) = ws_stream.split();

        Ok(Self {
            sink: Arc::new(Mutex::new(sink)),
            stream: Arc::new(Mutex::new(stream)),
        })
    }

    /// Send a message.
    pub async fn send(&self, msg: Message) -> Result<(), RuntimeError> {
        let tung_msg = message_to_tungstenite(msg);
        let mut sink = self.sink.lock().await;
        sink.send(tung_msg).await.map_err(|e| {
            tracing::debug!("WebSocket send error: {:?}", e);
            RuntimeError::ConnectionClosed
        })
    }

    /// Send a text message.
    pub async fn send_text(&self, text: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Message::Text(text.into())).await
    }

    /// Receive a message.
    ///
    /// Returns `None` if the connection is closed.
    pub async fn recv(&self) -> Result<Option<Message>, RuntimeError> {
        let mut stream = self.stream.lock().await;
        match stream.next().await {
            Some(Ok(msg)) => Ok(Some(tungstenite_to_message(msg))),
            Some(Err(e)) => {
                tracing::debug!("WebSocket recv error: {:?}", e);
                Err(RuntimeError::ConnectionClosed)
            }
            None => Ok(None),
        }
    }

    /// Close the connection normally.
    pub async fn close(&self, reason: &str) -> Result<(), RuntimeError> {
        let frame = CloseFrame::new(CloseCode::NORMAL, reason);
        self.send(Message::Close(Some(frame))).await
    }
}

/// Connects with retries until a deadline.
///
/// A runtime that was just spawned needs a moment before its port accepts
/// connections, so refused attempts are retried at `retry_interval`.
#[derive(Debug, Clone)]
pub struct WebSocketBuilder {
    url: Option<Url>,
    timeout: Duration,
    retry_interval: Duration,
}

impl Default for WebSocketBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WebSocketBuilder {
    /// Create a new WebSocket builder.
    pub fn new() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(30),
            retry_interval: Duration::from_millis(500),
        }
    }

    /// Set the URL to connect to.
    pub fn url(mut self, url: &str) -> Result<Self, RuntimeError> {
        self.url = Some(parse_ws_url(url)?);
        Ok(self)
    }

    /// Overall time allowed for all attempts.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delay between failed attempts.
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Connect to the server, retrying until the timeout elapses.
    pub async fn connect(self) -> Result<WebSocket, RuntimeError> {
        let url = self.url.ok_or(RuntimeError::InvalidUrl)?;
        // Durations too large for an `Instant` behave like no deadline.
        let deadline = Instant::now()
            .checked_add(self.timeout)
            .unwrap_or_else(far_future);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(RuntimeError::ConnectTimeout);
            }
            match tokio::time::timeout(remaining, WebSocket::connect(url.as_str())).await {
                Ok(Ok(ws)) => {
                    tracing::debug!(%url, attempt, "WebSocket connected");
                    return Ok(ws);
                }
                Ok(Err(e)) => {
                    tracing::debug!(%url, attempt, "WebSocket attempt failed: {}", e);
                }
                Err(_) => return Err(RuntimeError::ConnectTimeout),
            }
            if self.retry_interval >= deadline.saturating_duration_since(Instant::now()) {
                return Err(RuntimeError::ConnectTimeout);
            }
            tokio::time::sleep(self.retry_interval).await;
        }
    }
}

/// Roughly 30 years out, like tokio's own fallback for unbounded sleeps.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}

fn parse_ws_url(url: &str) -> Result<Url, RuntimeError> {
    let url = Url::parse(url).map_err(|_| RuntimeError::InvalidUrl)?;

    // Validate scheme
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(RuntimeError::InvalidUrl);
    }
    Ok(url)
}

/// Convert our Message to tungstenite Message.
fn message_to_tungstenite(msg: Message) -> tungstenite::Message {
    match msg {
        Message::Text(s) => tungstenite::Message::Text(s),
        Message::Binary(b) => tungstenite::Message::Binary(b.to_vec()),
        Message::Ping(d) => tungstenite::Message::Ping(d),
        Message::Pong(d) => tungstenite::Message::Pong(d),
        Message::Close(frame) => {
            let tung_frame = frame.map(|f| tungstenite::protocol::CloseFrame {
                code: tungstenite::protocol::frame::coding::CloseCode::from(f.code.0),
                reason: f.reason.into(),
            });
            tungstenite::Message::Close(tung_frame)
        }
    }
}

/// Convert tungstenite Message to our Message.
fn tungstenite_to_message(msg: tungstenite::Message) -> Message {
    match msg {
        tungstenite::Message::Text(s) => Message::Text(s.to_string()),
        tungstenite::Message::Binary(b) => Message::Binary(Bytes::from(b.to_vec())),
        tungstenite::Message::Ping(d) => Message::Ping(d.to_vec()),
        tungstenite::Message::Pong(d) => Message::Pong(d.to_vec()),
        tungstenite::Message::Close(frame) => {
            let our_frame = frame.map(|f| CloseFrame {
                code: CloseCode(f.code.into()),
                reason: f.reason.to_string(),
            });
            Message::Close(our_frame)
        }
        tungstenite::Message::Frame(_) => Message::Binary(Bytes::new()),
    }
}
