//! Execution state checkpointing against a [`StateStore`].
//!
//! Provides [`save_state`] to persist a controller snapshot when a
//! session closes, and [`restore_state`] to load it again when a session
//! with the same id starts.

use tracing::{debug, info, info_span, Instrument};

use crate::models::state::ExecutionState;
use crate::persistence::StateStore;
use crate::Result;

/// Persist `state` under `session_id`, replacing any previous snapshot.
///
/// # Errors
///
/// Returns `AppError::Corrupted` if the snapshot cannot be encoded, or the
/// store's error if the write fails.
pub async fn save_state(
    session_id: &str,
    state: &ExecutionState,
    store: &dyn StateStore,
) -> Result<()> {
    let span = info_span!("save_state", session_id);
    async move {
        let blob = state.to_bytes()?;
        let size = blob.len();
        store.save(session_id, blob).await?;

        info!(
            session_id,
            iteration = state.iteration,
            bytes = size,
            "execution state saved"
        );
        Ok(())
    }
    .instrument(span)
    .await
}

/// Load the snapshot persisted under `session_id` and park it for resume.
///
/// The returned state is in `Loading`; a resumable state it was saved in
/// is kept in `resume_state`.
///
/// # Errors
///
/// Returns `AppError::NotFound` if nothing is stored for the session,
/// `AppError::Corrupted` if the blob cannot be decoded, or the store's
/// error if the read fails.
pub async fn restore_state(session_id: &str, store: &dyn StateStore) -> Result<ExecutionState> {
    let span = info_span!("restore_state", session_id);
    async move {
        let blob = store.restore(session_id).await?;
        let mut state = ExecutionState::from_bytes(&blob)?;
        debug!(
            session_id,
            saved_state = ?state.agent_state,
            "decoded execution state"
        );
        state.prepare_for_resume();

        info!(
            session_id,
            iteration = state.iteration,
            resume_state = ?state.resume_state,
            "execution state restored"
        );
        Ok(state)
    }
    .instrument(span)
    .await
}
