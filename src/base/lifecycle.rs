/// Where the coordinator is in its single connect, launch, exit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Nothing has been attempted yet.
    #[default]
    Disconnected,

    /// Waiting for the runtime connection to come up.
    Connecting,

    /// Connected; the application has not been created yet.
    Ready,

    /// Waiting for the runtime to acknowledge the application.
    AppLaunching,

    /// The application is running. Auth events are handled here.
    AppRunning,

    /// Exit has been requested from the runtime.
    ShuttingDown,

    /// The connection is gone.
    Closed,
}

impl LifecycleState {
    /// Whether moving to `next` is a legal transition.
    ///
    /// `ShuttingDown` and `Closed` are reachable from any live state, since
    /// failures and lost connections can happen anywhere.
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Closed, _) => false,
            (_, Closed) => true,
            (ShuttingDown, _) => false,
            (_, ShuttingDown) => true,
            (Disconnected, Connecting) => true,
            (Connecting, Ready) => true,
            (Ready, AppLaunching) => true,
            (AppLaunching, AppRunning) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Disconnected => "disconnected",
            LifecycleState::Connecting => "connecting",
            LifecycleState::Ready => "ready",
            LifecycleState::AppLaunching => "app-launching",
            LifecycleState::AppRunning => "app-running",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Closed => "closed",
        };
        f.write_str(name)
    }
}
