//! Execution state snapshot persisted across session suspensions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AppError, Result};

/// Coarse state of the agent's reasoning loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    /// Waiting for the controller to pick the session up.
    Loading,
    /// Loop is executing steps.
    Running,
    /// Paused by the user.
    Paused,
    /// Blocked on a user decision about a proposed action.
    AwaitingUserConfirmation,
    /// Task completed.
    Finished,
    /// Stopped by the user or by session teardown.
    Stopped,
    /// Loop aborted with an error.
    Error,
}

impl AgentState {
    /// Whether a session interrupted in this state should resume into it.
    #[must_use]
    pub fn is_resumable(self) -> bool {
        matches!(
            self,
            Self::Running | Self::Paused | Self::AwaitingUserConfirmation
        )
    }
}

/// Serializable snapshot of a controller's progress.
///
/// Keyed by session id in the state store; the encoded form is opaque to
/// the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ExecutionState {
    /// Session this snapshot belongs to.
    pub session_id: String,
    /// Number of completed loop iterations.
    pub iteration: u32,
    /// Iteration ceiling in force when the snapshot was taken.
    pub max_iterations: u32,
    /// Whether actions required user confirmation.
    pub confirmation_mode: bool,
    /// Current loop state.
    pub agent_state: AgentState,
    /// State to resume into after a restore, if any.
    #[serde(default)]
    pub resume_state: Option<AgentState>,
    /// Budget consumed so far.
    pub accumulated_cost: f64,
    /// First event id belonging to this state's history.
    pub history_start: u64,
    /// Last event id the controller observed.
    #[serde(default)]
    pub last_event_id: Option<u64>,
    /// Last time the snapshot changed.
    pub updated_at: DateTime<Utc>,
}

impl ExecutionState {
    /// Construct a fresh state for a session.
    #[must_use]
    pub fn new(session_id: impl Into<String>, max_iterations: u32, confirmation_mode: bool) -> Self {
        Self {
            session_id: session_id.into(),
            iteration: 0,
            max_iterations,
            confirmation_mode,
            agent_state: AgentState::Loading,
            resume_state: None,
            accumulated_cost: 0.0,
            history_start: 0,
            last_event_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Encode the snapshot for the state store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Corrupted` if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a snapshot read from the state store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Corrupted` if the blob is not a valid snapshot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|err| AppError::Corrupted(format!("invalid execution state: {err}")))
    }

    /// Park the snapshot in `Loading`, remembering a resumable state.
    pub fn prepare_for_resume(&mut self) {
        self.resume_state = if self.agent_state.is_resumable() {
            Some(self.agent_state)
        } else {
            None
        };
        self.agent_state = AgentState::Loading;
    }

    /// Iterations left before the ceiling is reached.
    #[must_use]
    pub fn remaining_iterations(&self) -> u32 {
        self.max_iterations.saturating_sub(self.iteration)
    }
}
