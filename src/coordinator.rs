//! The connect, launch, authenticate-once, exit cycle.
//!
//! [`AuthCoordinator`] reacts to the connection's event stream:
//!
//! ```text
//! Disconnected -> Connecting -> Ready -> AppLaunching -> AppRunning
//!                     |                      |               |
//!                     +----------------------+---------------+--> ShuttingDown -> Closed
//! ```
//!
//! The first `window-auth-requested` in `AppRunning` is answered with the
//! configured credentials. A second one means those credentials were
//! rejected, so the runtime is shut down instead of being asked again.

use crate::base::error::RuntimeError;
use crate::base::gate::CloseGate;
use crate::base::lifecycle::LifecycleState;
use crate::config::{Credentials, RuntimeConfig};
use crate::runtime::events::{APP_CLOSED, WINDOW_AUTH_REQUESTED};
use crate::runtime::options::DEFAULT_APP_UUID;
use crate::runtime::{
    Ack, ApplicationOptions, ConnectionEvent, DesktopConnection, DesktopEvent, RuntimeApi,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// What happened to an auth-requested event.
#[derive(Debug)]
pub enum AuthDecision {
    /// Credentials were submitted; the handle resolves to the runtime's answer
    /// once it has been logged.
    Submitted(JoinHandle<Result<Ack, RuntimeError>>),
    /// Credentials were already tried once; shutdown was requested.
    Refused,
    /// Not acted on (wrong state, or no window in the event).
    Ignored,
}

impl AuthDecision {
    pub fn is_submitted(&self) -> bool {
        matches!(self, AuthDecision::Submitted(_))
    }
}

pub struct AuthCoordinator<R: RuntimeApi> {
    runtime: Arc<R>,
    credentials: Credentials,
    app: ApplicationOptions,
    state: Mutex<LifecycleState>,
    auth_already_tried: AtomicBool,
    shutdown_requested: AtomicBool,
    gate: CloseGate,
}

impl<R: RuntimeApi> AuthCoordinator<R> {
    pub fn new(runtime: Arc<R>, credentials: Credentials, app: ApplicationOptions) -> Self {
        Self {
            runtime,
            credentials,
            app,
            state: Mutex::new(LifecycleState::Disconnected),
            auth_already_tried: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            gate: CloseGate::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether credentials have been submitted.
    pub fn auth_already_tried(&self) -> bool {
        self.auth_already_tried.load(Ordering::SeqCst)
    }

    /// Whether `exit` has been sent to the runtime (or skipped as moot).
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn gate(&self) -> &CloseGate {
        &self.gate
    }

    fn transition(&self, next: LifecycleState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.can_transition_to(next) {
            tracing::debug!(from = %*state, to = %next, "Ignoring lifecycle transition");
            return false;
        }
        tracing::debug!(from = %*state, to = %next, "Lifecycle");
        *state = next;
        true
    }

    /// Mark the connection as in progress and pump `events` on a new task.
    ///
    /// The task ends after `Closed` has been handled.
    pub fn start(
        self: &Arc<Self>,
        events: mpsc::UnboundedReceiver<ConnectionEvent>,
    ) -> JoinHandle<()> {
        self.transition(LifecycleState::Connecting);
        let this = Arc::clone(self);
        tokio::spawn(async move { this.pump(events).await })
    }

    async fn pump(self: Arc<Self>, mut events: mpsc::UnboundedReceiver<ConnectionEvent>) {
        while let Some(event) = events.recv().await {
            let closed = matches!(event, ConnectionEvent::Closed);
            self.dispatch(event).await;
            if closed {
                return;
            }
        }
        // Every sender is gone, so no Closed can ever arrive.
        tracing::warn!("Connection event stream ended without a close");
        self.on_connection_closed();
    }

    /// Route one connection event to its handler.
    pub async fn dispatch(self: &Arc<Self>, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Ready => self.on_connection_ready().await,
            ConnectionEvent::Desktop(ev) => {
                tracing::info!(event = %ev.raw, "Runtime event");
                match ev.qualified_type().as_str() {
                    WINDOW_AUTH_REQUESTED => {
                        self.on_auth_requested(&ev).await;
                    }
                    APP_CLOSED => self.on_app_closed().await,
                    other => tracing::debug!(event_type = other, "Unhandled runtime event"),
                }
            }
            ConnectionEvent::Error(e) => self.on_connection_error(e).await,
            ConnectionEvent::Closed => self.on_connection_closed(),
        }
    }

    /// Create the application, subscribe to its events, and run it.
    pub async fn on_connection_ready(&self) {
        if !self.transition(LifecycleState::Ready)
            || !self.transition(LifecycleState::AppLaunching)
        {
            return;
        }
        match self.launch_application().await {
            Ok(()) => {
                self.transition(LifecycleState::AppRunning);
                tracing::info!(uuid = %self.app.uuid, "Application running");
            }
            Err(e) => {
                tracing::error!(uuid = %self.app.uuid, "Error launching application: {}", e);
                self.shutdown().await;
            }
        }
    }

    async fn launch_application(&self) -> Result<(), RuntimeError> {
        self.runtime.create_application(&self.app).await?;
        for event_type in [WINDOW_AUTH_REQUESTED, APP_CLOSED] {
            self.runtime.add_event_listener(&self.app.uuid, event_type).await?;
        }
        self.runtime.run_application(&self.app.uuid).await?;
        Ok(())
    }

    /// Answer the first auth request; shut down on the second.
    pub async fn on_auth_requested(self: &Arc<Self>, event: &DesktopEvent) -> AuthDecision {
        if self.state() != LifecycleState::AppRunning {
            tracing::debug!(state = %self.state(), "Auth request outside of a running app");
            return AuthDecision::Ignored;
        }
        let Some(window) = event.window() else {
            tracing::warn!("Auth request without a window uuid");
            return AuthDecision::Ignored;
        };

        if self
            .auth_already_tried
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::info!("Proxy auth failed. Shutting down runtime");
            self.shutdown().await;
            return AuthDecision::Refused;
        }

        if let Some(info) = &event.auth_info {
            tracing::info!(
                host = ?info.host,
                port = ?info.port,
                realm = ?info.realm,
                scheme = ?info.scheme,
                "Submitting proxy credentials"
            );
        }

        let this = Arc::clone(self);
        AuthDecision::Submitted(tokio::spawn(async move {
            let result = this
                .runtime
                .authenticate(
                    &window,
                    this.credentials.username(),
                    this.credentials.password(),
                    false,
                )
                .await;
            match &result {
                Ok(_) => tracing::info!("Proxy authentication worked"),
                Err(e) => tracing::info!("Proxy authentication failed: {}", e),
            }
            result
        }))
    }

    pub async fn on_app_closed(&self) {
        tracing::info!(uuid = %self.app.uuid, "Application closed");
        self.shutdown().await;
    }

    async fn on_connection_error(&self, error: RuntimeError) {
        tracing::error!("Runtime connection error: {}", error);
        self.shutdown().await;
    }

    /// Ask the runtime to exit. Only the first call does anything.
    ///
    /// Failures are logged; the connection's own close drives the rest.
    pub async fn shutdown(&self) {
        if self
            .shutdown_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        let before = self.state();
        self.transition(LifecycleState::ShuttingDown);

        // Nothing to exit if the connection never came up.
        if matches!(before, LifecycleState::Disconnected | LifecycleState::Connecting) {
            return;
        }
        if let Err(e) = self.runtime.exit().await {
            tracing::error!("Error exiting runtime: {}", e);
        }
    }

    /// Release whoever is waiting in [`wait_closed`](Self::wait_closed).
    pub fn on_connection_closed(&self) {
        self.transition(LifecycleState::Closed);
        if self.gate.release() {
            tracing::info!("Runtime connection closed");
        }
    }

    /// Wait until the connection has closed.
    pub async fn wait_closed(&self) {
        self.gate.wait().await
    }
}

/// Run one full cycle against the runtime described by `config`.
///
/// Returns once the runtime connection has closed.
pub async fn run(config: &RuntimeConfig) {
    let (connection, events) = DesktopConnection::open(config);
    let app = ApplicationOptions::new(DEFAULT_APP_UUID, config.app_url.clone());
    let coordinator = Arc::new(AuthCoordinator::new(
        Arc::new(connection),
        config.credentials.clone(),
        app,
    ));

    let pump = coordinator.start(events);
    coordinator.wait_closed().await;
    if let Err(e) = pump.await {
        tracing::debug!("Event pump ended abnormally: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::WindowIdentity;
    use async_trait::async_trait;

    /// Runtime that accepts everything and remembers nothing.
    struct NullRuntime;

    #[async_trait]
    impl RuntimeApi for NullRuntime {
        async fn create_application(&self, _: &ApplicationOptions) -> Result<Ack, RuntimeError> {
            Ok(Ack::ok())
        }
        async fn add_event_listener(&self, _: &str, _: &str) -> Result<Ack, RuntimeError> {
            Ok(Ack::ok())
        }
        async fn run_application(&self, _: &str) -> Result<Ack, RuntimeError> {
            Ok(Ack::ok())
        }
        async fn authenticate(
            &self,
            _: &WindowIdentity,
            _: Option<&str>,
            _: Option<&str>,
            _: bool,
        ) -> Result<Ack, RuntimeError> {
            Ok(Ack::ok())
        }
        async fn exit(&self) -> Result<Ack, RuntimeError> {
            Ok(Ack::ok())
        }
    }

    fn coordinator() -> Arc<AuthCoordinator<NullRuntime>> {
        Arc::new(AuthCoordinator::new(
            Arc::new(NullRuntime),
            Credentials::default(),
            ApplicationOptions::default(),
        ))
    }

    #[tokio::test]
    async fn test_ready_reaches_app_running() {
        let c = coordinator();
        c.transition(LifecycleState::Connecting);
        c.on_connection_ready().await;
        assert_eq!(c.state(), LifecycleState::AppRunning);
    }

    #[tokio::test]
    async fn test_ready_twice_is_ignored() {
        let c = coordinator();
        c.transition(LifecycleState::Connecting);
        c.on_connection_ready().await;
        c.on_connection_ready().await;
        assert_eq!(c.state(), LifecycleState::AppRunning);
    }

    #[tokio::test]
    async fn test_error_while_connecting_skips_exit() {
        let c = coordinator();
        c.transition(LifecycleState::Connecting);
        c.on_connection_error(RuntimeError::ConnectTimeout).await;
        assert_eq!(c.state(), LifecycleState::ShuttingDown);
        assert!(c.shutdown_requested());
        assert!(!c.gate().is_released());
    }
}
