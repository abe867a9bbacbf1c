//! Default controller: owns the execution state and enforces the
//! iteration and budget ceilings for each recorded step.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use super::{Controller, ControllerFactory, ControllerParams};
use crate::config::LlmConfig;
use crate::events::EventSource;
use crate::models::agent::{Agent, AgentSummary};
use crate::models::state::{AgentState, ExecutionState};
use crate::{AppError, BoxFuture, Result};

/// Controller holding the session's [`ExecutionState`].
#[derive(Debug)]
pub struct AgentController {
    params: ControllerParams,
    state: ExecutionState,
    closed: bool,
}

impl AgentController {
    /// Construct a controller with a fresh state and announce it on the
    /// event stream. The announcement's id becomes the start of the
    /// state's history.
    pub async fn new(params: ControllerParams) -> Self {
        let started = params
            .event_stream
            .append(
                EventSource::Environment,
                json!({
                    "kind": "controller_started",
                    "agent": AgentSummary::from(params.agent.as_ref()),
                    "max_iterations": params.max_iterations,
                    "confirmation_mode": params.confirmation_mode,
                    "headless_mode": params.headless_mode,
                }),
            )
            .await;

        let mut state = ExecutionState::new(
            params.session_id.clone(),
            params.max_iterations,
            params.confirmation_mode,
        );
        state.history_start = started.id;
        state.last_event_id = Some(started.id);

        Self {
            params,
            state,
            closed: false,
        }
    }

    /// Agent driven by this controller.
    #[must_use]
    pub fn agent(&self) -> &Agent {
        &self.params.agent
    }

    /// Whether the controller runs without a frontend observer.
    #[must_use]
    pub fn is_headless(&self) -> bool {
        self.params.headless_mode
    }

    /// Spend ceiling per task, if any.
    #[must_use]
    pub fn max_budget_per_task(&self) -> Option<f64> {
        self.params.max_budget_per_task
    }

    /// Model binding for `agent_name`, preferring the per-agent override
    /// and falling back to the controller's own agent binding.
    #[must_use]
    pub fn llm_config_for(&self, agent_name: &str) -> &LlmConfig {
        self.params
            .agent_to_llm_config
            .as_ref()
            .and_then(|map| map.get(agent_name))
            .unwrap_or(&self.params.agent.llm)
    }

    /// Whether [`close`](Controller::close) has completed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Account one loop iteration costing `cost`.
    ///
    /// Returns the new iteration count.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Controller` if the controller is closed, `cost`
    /// is negative or not finite, the iteration ceiling is reached, or the
    /// step would exceed the budget. A rejected step changes nothing.
    pub async fn record_step(&mut self, cost: f64) -> Result<u32> {
        if self.closed {
            return Err(AppError::Controller("controller is closed".into()));
        }
        if !cost.is_finite() || cost < 0.0 {
            return Err(AppError::Controller(format!("invalid step cost {cost}")));
        }
        if self.state.remaining_iterations() == 0 {
            return Err(AppError::Controller(format!(
                "iteration limit of {} reached",
                self.state.max_iterations
            )));
        }

        let total = self.state.accumulated_cost + cost;
        if let Some(budget) = self.params.max_budget_per_task {
            if total > budget {
                return Err(AppError::Controller(format!(
                    "step would exceed the task budget of {budget:.2}"
                )));
            }
        }

        self.state.iteration += 1;
        self.state.accumulated_cost = total;
        self.state.agent_state = AgentState::Running;
        self.state.last_event_id = self.params.event_stream.latest_id().await;
        self.state.updated_at = Utc::now();

        debug!(
            session_id = %self.params.session_id,
            iteration = self.state.iteration,
            accumulated_cost = self.state.accumulated_cost,
            "step recorded"
        );
        Ok(self.state.iteration)
    }
}

impl Controller for AgentController {
    fn get_state(&self) -> ExecutionState {
        self.state.clone()
    }

    fn set_initial_state(
        &mut self,
        state: ExecutionState,
        max_iterations: u32,
        confirmation_mode: bool,
    ) {
        self.state = state;
        self.state.max_iterations = max_iterations;
        self.state.confirmation_mode = confirmation_mode;
        self.state.updated_at = Utc::now();
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return Ok(());
            }

            if !matches!(
                self.state.agent_state,
                AgentState::Finished | AgentState::Error
            ) {
                self.state.agent_state = AgentState::Stopped;
            }

            let closed = self
                .params
                .event_stream
                .append(
                    EventSource::Environment,
                    json!({
                        "kind": "controller_closed",
                        "iteration": self.state.iteration,
                    }),
                )
                .await;
            self.state.last_event_id = Some(closed.id);
            self.state.updated_at = Utc::now();
            self.closed = true;

            info!(
                session_id = %self.params.session_id,
                iteration = self.state.iteration,
                "controller closed"
            );
            Ok(())
        })
    }
}

/// Factory producing [`AgentController`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentControllerFactory;

impl ControllerFactory for AgentControllerFactory {
    fn create(&self, params: ControllerParams) -> BoxFuture<'_, Box<dyn Controller>> {
        Box::pin(async move {
            let controller = AgentController::new(params).await;
            Ok(Box::new(controller) as Box<dyn Controller>)
        })
    }
}
