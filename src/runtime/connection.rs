//! Connection to the runtime's control channel.
//!
//! [`DesktopConnection::open`] returns at once; connecting happens on a
//! background task and its outcome arrives on the event stream as
//! [`ConnectionEvent::Ready`] or [`ConnectionEvent::Error`] followed by
//! [`ConnectionEvent::Closed`].

use super::api::RuntimeApi;
use super::events::{ConnectionEvent, WindowIdentity};
use super::launcher;
use super::options::ApplicationOptions;
use super::protocol::{actions, decode, Ack, Inbound, Request};
use crate::base::error::RuntimeError;
use crate::config::RuntimeConfig;
use crate::ws::{Message, WebSocket, WebSocketBuilder};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, OnceCell};

/// Name this client registers under.
pub const CONNECTION_NAME: &str = "proxyauth";

/// Handle to the runtime connection. Cheap to clone.
#[derive(Clone)]
pub struct DesktopConnection {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    socket: OnceCell<WebSocket>,
    /// Requests waiting for their ack, keyed by message id.
    pending: DashMap<u64, oneshot::Sender<Ack>>,
    next_id: AtomicU64,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    closed: AtomicBool,
}

impl DesktopConnection {
    /// Start connecting and return immediately.
    ///
    /// The returned receiver yields `Ready` once the runtime has accepted
    /// the connection, and `Closed` exactly once when it goes away (or could
    /// not be established).
    pub fn open(config: &RuntimeConfig) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Self {
            inner: Arc::new(Inner {
                name: CONNECTION_NAME.to_string(),
                socket: OnceCell::new(),
                pending: DashMap::new(),
                next_id: AtomicU64::new(1),
                events: tx,
                closed: AtomicBool::new(false),
            }),
        };

        let task = conn.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let timeout = config.connect_timeout;
            let outcome = match tokio::time::timeout(timeout, task.establish(&config)).await {
                Ok(result) => result,
                Err(_) => Err(RuntimeError::ConnectTimeout),
            };
            match outcome {
                Ok(()) => {
                    tracing::info!(url = %config.websocket_url(), "Connected to runtime");
                    task.emit(ConnectionEvent::Ready);
                }
                Err(e) => {
                    tracing::error!("Connection to runtime failed: {}", e);
                    task.emit(ConnectionEvent::Error(e));
                    task.abort().await;
                }
            }
        });

        (conn, rx)
    }

    /// Check if the connection has closed.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Launch, connect, start the reader, then authorize.
    async fn establish(&self, config: &RuntimeConfig) -> Result<(), RuntimeError> {
        if let Some(pid) = launcher::launch(config).await? {
            tracing::debug!(pid, "Runtime launcher started");
        }

        let socket = WebSocketBuilder::new()
            .url(&config.websocket_url())?
            .timeout(config.connect_timeout)
            .connect()
            .await?;
        self.inner
            .socket
            .set(socket)
            .map_err(|_| RuntimeError::Protocol("connection opened twice".into()))?;

        let reader = self.clone();
        tokio::spawn(async move { reader.read_loop().await });

        self.request(
            actions::REQUEST_AUTHORIZATION,
            json!({
                "uuid": self.inner.name,
                "type": "external-connection",
                "runtimeVersion": config.runtime_version,
                "nonPersistent": true,
            }),
        )
        .await?;
        Ok(())
    }

    /// Route incoming frames until the socket closes.
    async fn read_loop(&self) {
        let Some(socket) = self.inner.socket.get() else {
            return;
        };
        loop {
            match socket.recv().await {
                Ok(Some(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Runtime closed the socket");
                    break;
                }
                Ok(Some(msg)) => {
                    if let Some(text) = msg.into_text() {
                        self.dispatch_text(&text);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Runtime socket error: {}", e);
                    break;
                }
            }
        }
        self.finish();
    }

    fn dispatch_text(&self, text: &str) {
        tracing::trace!(frame = %text, "<- runtime");
        match decode(text) {
            Ok(Inbound::Ack { correlation_id, ack }) => {
                match self.inner.pending.remove(&correlation_id) {
                    Some((_, waiter)) => {
                        // The requester may have given up; nothing to do then.
                        let _ = waiter.send(ack);
                    }
                    None => tracing::debug!(correlation_id, "Ack for unknown request"),
                }
            }
            Ok(Inbound::Event(event)) => self.emit(ConnectionEvent::Desktop(event)),
            Ok(Inbound::Other(action)) => tracing::debug!(%action, "Ignoring runtime message"),
            Err(e) => tracing::warn!("Undecodable runtime message: {}", e),
        }
    }

    /// Send one request and wait for its ack.
    pub async fn request(&self, action: &str, payload: Value) -> Result<Ack, RuntimeError> {
        if self.is_closed() {
            return Err(RuntimeError::ConnectionClosed);
        }
        let socket = self.inner.socket.get().ok_or(RuntimeError::NotConnected)?;

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let text = Request::new(action, id, payload).to_json()?;
        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(id, tx);
        // `finish` may have drained the table between the check above and the insert.
        if self.is_closed() {
            self.inner.pending.remove(&id);
            return Err(RuntimeError::ConnectionClosed);
        }

        tracing::debug!(action, id, "-> runtime");
        if let Err(e) = socket.send_text(text).await {
            self.inner.pending.remove(&id);
            return Err(e);
        }

        let ack = rx.await.map_err(|_| RuntimeError::ConnectionClosed)?;
        ack.into_result(action)
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.inner.events.send(event).is_err() {
            tracing::debug!("Connection event dropped, no listener");
        }
    }

    /// Tear down after a failed connect.
    async fn abort(&self) {
        if let Some(socket) = self.inner.socket.get() {
            if let Err(e) = socket.close("connect failed").await {
                tracing::debug!("Closing runtime socket: {}", e);
            }
        }
        self.finish();
    }

    /// Fail outstanding requests and report `Closed`, once.
    fn finish(&self) {
        if self
            .inner
            .closed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        // Dropping the senders wakes every waiter with ConnectionClosed.
        self.inner.pending.clear();
        tracing::info!("Connection to runtime is closed");
        self.emit(ConnectionEvent::Closed);
    }
}

#[async_trait]
impl RuntimeApi for DesktopConnection {
    async fn create_application(&self, options: &ApplicationOptions) -> Result<Ack, RuntimeError> {
        self.request(actions::CREATE_APPLICATION, serde_json::to_value(options)?)
            .await
    }

    async fn add_event_listener(
        &self,
        app_uuid: &str,
        event_type: &str,
    ) -> Result<Ack, RuntimeError> {
        self.request(
            actions::SUBSCRIBE,
            json!({ "topic": "application", "type": event_type, "uuid": app_uuid }),
        )
        .await
    }

    async fn run_application(&self, app_uuid: &str) -> Result<Ack, RuntimeError> {
        self.request(actions::RUN_APPLICATION, json!({ "uuid": app_uuid }))
            .await
    }

    async fn authenticate(
        &self,
        window: &WindowIdentity,
        username: Option<&str>,
        password: Option<&str>,
        cancel: bool,
    ) -> Result<Ack, RuntimeError> {
        self.request(
            actions::WINDOW_AUTHENTICATE,
            json!({
                "uuid": window.uuid,
                "name": window.name,
                "userName": username,
                "password": password,
                "cancel": cancel,
            }),
        )
        .await
    }

    async fn exit(&self) -> Result<Ack, RuntimeError> {
        match self.request(actions::EXIT_DESKTOP, json!({})).await {
            // The runtime may drop the socket before acking its own exit.
            Err(RuntimeError::ConnectionClosed) => Ok(Ack::ok()),
            other => other,
        }
    }
}

impl std::fmt::Debug for DesktopConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopConnection")
            .field("name", &self.inner.name)
            .field("connected", &self.inner.socket.initialized())
            .field("closed", &self.is_closed())
            .field("pending", &self.inner.pending.len())
            .finish()
    }
}
