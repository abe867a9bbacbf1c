//! Session orchestration modules.
//!
//! Covers the per-session subsystem lifecycle, execution state
//! checkpointing, and the process-wide session registry.

pub mod agent_session;
pub mod checkpoint_manager;
pub mod session_manager;

pub use agent_session::{AgentSession, SubsystemFactories};
pub use session_manager::{SessionManager, SharedSession};
