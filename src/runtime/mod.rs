//! Talking to the desktop runtime.
//!
//! - [`protocol`]: JSON request/ack/event envelopes
//! - [`events`]: desktop events and connection lifecycle events
//! - [`options`]: application and window options
//! - [`api`]: the [`RuntimeApi`] trait the coordinator is written against
//! - [`connection`]: [`DesktopConnection`], the WebSocket-backed implementation
//! - [`launcher`]: spawning the runtime with a startup manifest

pub mod api;
pub mod connection;
pub mod events;
pub mod launcher;
pub mod options;
pub mod protocol;

pub use api::RuntimeApi;
pub use connection::DesktopConnection;
pub use events::{AuthInfo, ConnectionEvent, DesktopEvent, WindowIdentity};
pub use options::{ApplicationOptions, WindowOptions};
pub use protocol::Ack;
