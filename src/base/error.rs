use thiserror::Error;

/// Fatal configuration problems, reported before any connection attempt.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required property {0}")]
    MissingProperty(&'static str),
    #[error("Invalid proxy location {0:?} (expected host:port)")]
    InvalidProxyLocation(String),
    #[error("Invalid number for {key}: {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("Invalid property definition {0:?} (expected key=value)")]
    InvalidDefinition(String),
}

/// Failures of calls into the runtime.
///
/// None of these are fatal: the coordinator logs them and requests shutdown.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RuntimeError {
    // Connection Errors
    #[error("Timed out connecting to runtime")]
    ConnectTimeout,
    #[error("Connection to runtime failed: {0}")]
    ConnectionFailed(String),
    #[error("Not connected to runtime")]
    NotConnected,
    #[error("Connection to runtime closed")]
    ConnectionClosed,
    #[error("Invalid runtime address")]
    InvalidUrl,

    // Protocol Errors
    #[error("{action} was rejected by runtime: {reason}")]
    AckFailed { action: String, reason: String },
    #[error("Protocol error: {0}")]
    Protocol(String),

    // Launcher Errors
    #[error("Failed to launch runtime: {0}")]
    Launch(String),
}

impl RuntimeError {
    /// Build an `AckFailed` from a rejected action, defaulting the reason.
    pub fn ack_failed(action: &str, reason: Option<&str>) -> Self {
        RuntimeError::AckFailed {
            action: action.to_string(),
            reason: reason.unwrap_or("no reason given").to_string(),
        }
    }
}

impl From<serde_json::Error> for RuntimeError {
    fn from(e: serde_json::Error) -> Self {
        RuntimeError::Protocol(e.to_string())
    }
}
