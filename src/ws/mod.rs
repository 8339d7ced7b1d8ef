//! WebSocket transport to the runtime's control channel.
//!
//! Provides WebSocket connections using tokio-tungstenite.
//!
//! # Example
//! ```ignore
//! use proxyauth::ws::{WebSocketBuilder, Message};
//!
//! let ws = WebSocketBuilder::new().url("ws://127.0.0.1:9696")?.connect().await?;
//! ws.send(Message::Text("{}".into())).await?;
//! let msg = ws.recv().await?;
//! ```

mod connection;
mod message;

pub use connection::{WebSocket, WebSocketBuilder};
pub use message::{CloseCode, CloseFrame, Message};
