//! Session lifecycle phases and the legal transitions between them.

use serde::{Deserialize, Serialize};

/// Lifecycle phase of an [`AgentSession`](crate::orchestrator::agent_session::AgentSession).
///
/// `Closed` is terminal. Every other phase may move to `Closing`, so a
/// session can always be torn down no matter how far `start` got.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Constructed; only the event stream exists.
    Created,
    /// `start` is building subsystems, or failed part-way through.
    Starting,
    /// Analyzer (optional), runtime, and controller are all in place.
    Running,
    /// `close` is tearing subsystems down.
    Closing,
    /// Torn down; no subsystem may be created again.
    Closed,
}

impl SessionPhase {
    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Starting)
                | (Self::Starting, Self::Running)
                | (
                    Self::Created | Self::Starting | Self::Running,
                    Self::Closing
                )
                | (Self::Closing, Self::Closed)
        )
    }

    /// Whether the session has begun or finished tearing down.
    #[must_use]
    pub fn is_shutting_down(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    /// Stable lower-case name used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}
