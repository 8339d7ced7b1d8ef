//! # proxyauth
//!
//! Supplies proxy-server credentials to a desktop application runtime when
//! it asks for them.
//!
//! The program connects to the runtime's WebSocket control channel, creates
//! one application, and answers the first `window-auth-requested` event with
//! the configured username and password. If the runtime asks again the
//! credentials were rejected, and the runtime is shut down instead of being
//! answered twice. The process exits once the connection has closed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use proxyauth::config::{ProcessEnvironment, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let env = ProcessEnvironment::from_env()
//!         .with("runtime.version", "stable")
//!         .with("proxy.location", "proxy.mycompany.com:8888");
//!     let config = RuntimeConfig::from_environment(&env).unwrap();
//!     proxyauth::run(&config).await;
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error types, lifecycle state, and the close gate
//! - [`config`] - Process properties and the derived runtime configuration
//! - [`coordinator`] - The event-driven authentication cycle
//! - [`runtime`] - Wire protocol, connection, and runtime launcher
//! - [`ws`] - WebSocket transport

pub mod base;
pub mod config;
pub mod coordinator;
pub mod runtime;
pub mod ws;

pub use coordinator::{run, AuthCoordinator, AuthDecision};
