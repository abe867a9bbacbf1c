//! Controller abstraction: the driver of the agent's reasoning loop.
//!
//! The orchestrator only constructs, seeds, snapshots, and closes
//! controllers; the loop itself lives behind [`Controller`].

pub mod agent_controller;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::events::EventStream;
use crate::models::agent::Agent;
use crate::models::state::ExecutionState;
use crate::BoxFuture;

pub use agent_controller::{AgentController, AgentControllerFactory};

/// Everything a controller is constructed with.
#[derive(Debug, Clone)]
pub struct ControllerParams {
    /// Owning session id.
    pub session_id: String,
    /// Session event stream.
    pub event_stream: Arc<EventStream>,
    /// Agent driven by the controller.
    pub agent: Arc<Agent>,
    /// Iteration ceiling.
    pub max_iterations: u32,
    /// Optional spend ceiling.
    pub max_budget_per_task: Option<f64>,
    /// Per-agent model overrides for delegated agents.
    pub agent_to_llm_config: Option<HashMap<String, LlmConfig>>,
    /// Whether actions need user confirmation.
    pub confirmation_mode: bool,
    /// Whether the controller runs without a frontend observer.
    pub headless_mode: bool,
}

/// Reasoning-loop driver bound to one session.
pub trait Controller: Send + Sync {
    /// Snapshot of the controller's current progress.
    fn get_state(&self) -> ExecutionState;

    /// Seed the controller with a restored snapshot.
    ///
    /// `max_iterations` and `confirmation_mode` always override the values
    /// carried in `state`, so a restored snapshot cannot bypass the
    /// current limits.
    fn set_initial_state(
        &mut self,
        state: ExecutionState,
        max_iterations: u32,
        confirmation_mode: bool,
    );

    /// Stop the loop and release resources.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Controller` if teardown fails.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Builds controllers for sessions. Construction may perform I/O.
pub trait ControllerFactory: Send + Sync {
    /// Construct a controller from `params`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Controller` if construction fails.
    fn create(&self, params: ControllerParams) -> BoxFuture<'_, Box<dyn Controller>>;
}
