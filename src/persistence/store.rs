//! State store binding consumed by the session orchestrator.

use crate::BoxFuture;

/// Persistent key/value byte store addressed by session id.
///
/// The blob format is opaque to the store. Implementations must be safe
/// for concurrent use; the orchestrator adds no locking around them.
pub trait StateStore: Send + Sync {
    /// Create or overwrite the blob stored for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` (or an implementation-specific variant) if
    /// the write fails.
    fn save(&self, session_id: &str, blob: Vec<u8>) -> BoxFuture<'_, ()>;

    /// Read the blob stored for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if nothing was saved for the session,
    /// or `AppError::Db` if the store is unavailable.
    fn restore(&self, session_id: &str) -> BoxFuture<'_, Vec<u8>>;

    /// Remove the blob stored for `session_id`. Removing a missing entry
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the delete fails.
    fn delete(&self, session_id: &str) -> BoxFuture<'_, ()>;
}
