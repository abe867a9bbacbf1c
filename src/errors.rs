//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
///
/// Lifecycle protocol violations (`AlreadyStarted`, `AlreadyClosed`,
/// `RuntimeAlreadyExists`, `ControllerAlreadyExists`, `RuntimeNotReady`)
/// are programmer errors and are never retried.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Persistence failure when interacting with `SQLite`.
    Db(String),
    /// Requested entity does not exist.
    NotFound(String),
    /// A persisted blob could not be decoded.
    Corrupted(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// `start` called on a session that already left the `Created` phase.
    AlreadyStarted(String),
    /// `start` called on a session that is closing or closed.
    AlreadyClosed(String),
    /// A runtime was constructed twice for the same session.
    RuntimeAlreadyExists(String),
    /// A controller was constructed twice for the same session.
    ControllerAlreadyExists(String),
    /// Controller construction attempted before the runtime exists.
    RuntimeNotReady(String),
    /// No runtime is registered under the requested name.
    UnknownRuntime(String),
    /// Runtime initialization or teardown failure.
    Runtime(String),
    /// Controller construction, accounting, or teardown failure.
    Controller(String),
    /// Security analyzer failure.
    Analyzer(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Db(msg) => write!(f, "db: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Corrupted(msg) => write!(f, "corrupted: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::AlreadyStarted(msg) => write!(f, "already started: {msg}"),
            Self::AlreadyClosed(msg) => write!(f, "already closed: {msg}"),
            Self::RuntimeAlreadyExists(msg) => write!(f, "runtime already exists: {msg}"),
            Self::ControllerAlreadyExists(msg) => write!(f, "controller already exists: {msg}"),
            Self::RuntimeNotReady(msg) => write!(f, "runtime not ready: {msg}"),
            Self::UnknownRuntime(msg) => write!(f, "unknown runtime: {msg}"),
            Self::Runtime(msg) => write!(f, "runtime: {msg}"),
            Self::Controller(msg) => write!(f, "controller: {msg}"),
            Self::Analyzer(msg) => write!(f, "analyzer: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Whether this error is a misuse of the session lifecycle API.
    #[must_use]
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStarted(_)
                | Self::AlreadyClosed(_)
                | Self::RuntimeAlreadyExists(_)
                | Self::ControllerAlreadyExists(_)
                | Self::RuntimeNotReady(_)
        )
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Corrupted(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
