use crate::base::error::{ConfigError, RuntimeError};
use crate::base::lifecycle::LifecycleState;

#[test]
fn test_config_error_messages() {
    let err = ConfigError::MissingProperty("runtime.version");
    assert_eq!(err.to_string(), "Missing required property runtime.version");

    let err = ConfigError::InvalidProxyLocation("nohost".into());
    assert!(err.to_string().contains("host:port"));
}

#[test]
fn test_ack_failed_default_reason() {
    let err = RuntimeError::ack_failed("run-application", None);
    assert_eq!(
        err,
        RuntimeError::AckFailed {
            action: "run-application".into(),
            reason: "no reason given".into(),
        }
    );
    assert_eq!(
        err.to_string(),
        "run-application was rejected by runtime: no reason given"
    );
}

#[test]
fn test_lifecycle_happy_path() {
    use LifecycleState::*;
    let path = [Disconnected, Connecting, Ready, AppLaunching, AppRunning, ShuttingDown, Closed];
    for pair in path.windows(2) {
        assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
    }
}

#[test]
fn test_lifecycle_error_shortcuts() {
    use LifecycleState::*;
    assert!(Connecting.can_transition_to(ShuttingDown));
    assert!(AppLaunching.can_transition_to(ShuttingDown));
    assert!(Connecting.can_transition_to(Closed));
}

#[test]
fn test_lifecycle_closed_is_terminal() {
    use LifecycleState::*;
    for next in [Disconnected, Connecting, Ready, AppRunning, ShuttingDown, Closed] {
        assert!(!Closed.can_transition_to(next));
    }
    assert!(!ShuttingDown.can_transition_to(AppRunning));
    assert!(!Ready.can_transition_to(AppRunning));
}
