//! The calls the coordinator makes into the runtime.

use super::events::WindowIdentity;
use super::options::ApplicationOptions;
use super::protocol::Ack;
use crate::base::error::RuntimeError;
use async_trait::async_trait;

/// Asynchronous runtime operations, each resolving to a single typed outcome.
///
/// [`DesktopConnection`](super::DesktopConnection) is the real implementation.
#[async_trait]
pub trait RuntimeApi: Send + Sync + 'static {
    /// Create an application. Resolves once the runtime has acknowledged it.
    async fn create_application(&self, options: &ApplicationOptions) -> Result<Ack, RuntimeError>;

    /// Subscribe to an application event such as `window-auth-requested`.
    async fn add_event_listener(&self, app_uuid: &str, event_type: &str)
        -> Result<Ack, RuntimeError>;

    /// Start a created application.
    async fn run_application(&self, app_uuid: &str) -> Result<Ack, RuntimeError>;

    /// Answer a window's pending auth challenge.
    async fn authenticate(
        &self,
        window: &WindowIdentity,
        username: Option<&str>,
        password: Option<&str>,
        cancel: bool,
    ) -> Result<Ack, RuntimeError>;

    /// Ask the runtime to shut down. The connection closes afterwards.
    async fn exit(&self) -> Result<Ack, RuntimeError>;
}
