//! Unit tests for `AppError` rendering, classification, and conversions.

use agent_session::AppError;

#[test]
fn display_prefixes_domain() {
    assert_eq!(
        AppError::UnknownRuntime("'docker' is not registered".into()).to_string(),
        "unknown runtime: 'docker' is not registered"
    );
    assert_eq!(
        AppError::AlreadyStarted("s1".into()).to_string(),
        "already started: s1"
    );
    assert_eq!(
        AppError::RuntimeNotReady("s1".into()).to_string(),
        "runtime not ready: s1"
    );
    assert_eq!(AppError::Db("locked".into()).to_string(), "db: locked");
}

#[test]
fn lifecycle_misuse_is_a_protocol_violation() {
    for err in [
        AppError::AlreadyStarted(String::new()),
        AppError::AlreadyClosed(String::new()),
        AppError::RuntimeAlreadyExists(String::new()),
        AppError::ControllerAlreadyExists(String::new()),
        AppError::RuntimeNotReady(String::new()),
    ] {
        assert!(err.is_protocol_violation(), "{err}");
    }
}

#[test]
fn subsystem_failures_are_not_protocol_violations() {
    for err in [
        AppError::UnknownRuntime(String::new()),
        AppError::Runtime(String::new()),
        AppError::Controller(String::new()),
        AppError::Analyzer(String::new()),
        AppError::NotFound(String::new()),
    ] {
        assert!(!err.is_protocol_violation(), "{err}");
    }
}

#[test]
fn json_error_converts_to_corrupted() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let err: AppError = json_err.into();
    assert!(matches!(err, AppError::Corrupted(_)));
}

#[test]
fn io_error_converts_to_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: AppError = io_err.into();
    assert!(matches!(err, AppError::Io(msg) if msg.contains("denied")));
}
