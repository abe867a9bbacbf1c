//! Session orchestrator: owns one analyzer, one runtime, and one controller
//! for the lifetime of a session.
//!
//! Subsystems come up in dependency order (analyzer, runtime, controller)
//! and go down in reverse. Every mutation is gated on [`SessionPhase`], so
//! a session can be started at most once and never again after `close`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use super::checkpoint_manager;
use crate::config::{GlobalConfig, LlmConfig};
use crate::controller::{AgentControllerFactory, Controller, ControllerFactory, ControllerParams};
use crate::events::EventStream;
use crate::models::agent::Agent;
use crate::models::session::SessionPhase;
use crate::persistence::StateStore;
use crate::runtime::{Runtime, RuntimeConstructor, RuntimeParams, RuntimeRegistry};
use crate::security::{AnalyzerRegistry, SecurityAnalyzer};
use crate::{AppError, Result};

/// The three subsystem factories a session builds from.
#[derive(Clone)]
pub struct SubsystemFactories {
    /// Security analyzer selection.
    pub analyzers: AnalyzerRegistry,
    /// Runtime selection.
    pub runtimes: RuntimeRegistry,
    /// Controller construction.
    pub controllers: Arc<dyn ControllerFactory>,
}

impl SubsystemFactories {
    /// Factories with every built-in implementation registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            analyzers: AnalyzerRegistry::with_defaults(),
            runtimes: RuntimeRegistry::with_defaults(),
            controllers: Arc::new(AgentControllerFactory),
        }
    }
}

impl Default for SubsystemFactories {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One bounded lifetime of an agent's execution context.
///
/// `start` and `close` take `&mut self`; a host that shares a session
/// between tasks wraps it in a `tokio::sync::Mutex`.
pub struct AgentSession {
    session_id: String,
    event_stream: Arc<EventStream>,
    state_store: Arc<dyn StateStore>,
    factories: SubsystemFactories,
    phase: SessionPhase,
    analyzer: Option<Box<dyn SecurityAnalyzer>>,
    runtime: Option<Box<dyn Runtime>>,
    controller: Option<Box<dyn Controller>>,
}

impl AgentSession {
    /// Create a session using the built-in subsystem factories.
    #[must_use]
    pub fn new(session_id: impl Into<String>, state_store: Arc<dyn StateStore>) -> Self {
        Self::with_factories(session_id, state_store, SubsystemFactories::with_defaults())
    }

    /// Create a session that builds its subsystems from `factories`.
    #[must_use]
    pub fn with_factories(
        session_id: impl Into<String>,
        state_store: Arc<dyn StateStore>,
        factories: SubsystemFactories,
    ) -> Self {
        let session_id = session_id.into();
        let event_stream = Arc::new(EventStream::new(session_id.clone()));
        Self {
            session_id,
            event_stream,
            state_store,
            factories,
            phase: SessionPhase::Created,
            analyzer: None,
            runtime: None,
            controller: None,
        }
    }

    /// Session identifier.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Whether `close` has completed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.phase == SessionPhase::Closed
    }

    /// Event stream shared by every subsystem of this session.
    #[must_use]
    pub fn event_stream(&self) -> &Arc<EventStream> {
        &self.event_stream
    }

    /// Security analyzer, if one was configured.
    #[must_use]
    pub fn analyzer(&self) -> Option<&dyn SecurityAnalyzer> {
        self.analyzer.as_deref()
    }

    /// Runtime, once constructed.
    #[must_use]
    pub fn runtime(&self) -> Option<&dyn Runtime> {
        self.runtime.as_deref()
    }

    /// Controller, once constructed.
    #[must_use]
    pub fn controller(&self) -> Option<&dyn Controller> {
        self.controller.as_deref()
    }

    /// Mutable access to the controller, once constructed.
    pub fn controller_mut(&mut self) -> Option<&mut (dyn Controller + 'static)> {
        self.controller.as_deref_mut()
    }

    /// Bring the session's subsystems up.
    ///
    /// The runtime name is resolved before anything is built. Then the
    /// analyzer is created (if configured), the runtime is created and
    /// initialized, and the controller is created and seeded with any
    /// execution state previously saved for this session id. A failure
    /// after resolution leaves the session in `Starting`; only
    /// [`close`](Self::close) is legal afterwards.
    ///
    /// # Errors
    ///
    /// - `AppError::AlreadyStarted` if the session left `Created`.
    /// - `AppError::AlreadyClosed` if the session is closing or closed.
    /// - `AppError::UnknownRuntime` if `runtime_name` is not registered.
    /// - `AppError::Runtime` / `AppError::Controller` if a subsystem fails
    ///   to come up.
    pub async fn start(
        &mut self,
        runtime_name: &str,
        config: Arc<GlobalConfig>,
        agent: Arc<Agent>,
        max_iterations: u32,
        max_budget_per_task: Option<f64>,
        agent_to_llm_config: Option<HashMap<String, LlmConfig>>,
    ) -> Result<()> {
        let span = info_span!(
            "start_session",
            session_id = %self.session_id,
            runtime = runtime_name,
            agent = %agent.name
        );
        async move {
            match self.phase {
                SessionPhase::Created => {}
                SessionPhase::Starting | SessionPhase::Running => {
                    return Err(AppError::AlreadyStarted(format!(
                        "session '{}' is {}; close it and create a new session",
                        self.session_id,
                        self.phase.as_str()
                    )));
                }
                SessionPhase::Closing | SessionPhase::Closed => {
                    return Err(AppError::AlreadyClosed(format!(
                        "session '{}' is {}",
                        self.session_id,
                        self.phase.as_str()
                    )));
                }
            }

            let runtime_constructor = self.factories.runtimes.resolve(runtime_name)?;
            self.transition(SessionPhase::Starting)?;

            self.create_security_analyzer(&config);
            self.create_runtime(&runtime_constructor, Arc::clone(&config), &agent)
                .await?;
            self.create_controller(
                agent,
                &config,
                max_iterations,
                max_budget_per_task,
                agent_to_llm_config,
            )
            .await?;

            self.transition(SessionPhase::Running)?;
            info!(
                analyzer = self.analyzer.as_ref().map(|analyzer| analyzer.name()),
                "session started"
            );
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Tear the session down: save the controller's execution state, then
    /// close controller, runtime, and analyzer in that order.
    ///
    /// Each subsystem is taken out of its slot as it is torn down, and a
    /// failure in one never prevents the next from being attempted.
    /// Failures are logged, never returned. Calling `close` on a closed
    /// session does nothing.
    pub async fn close(&mut self) {
        if self.phase == SessionPhase::Closed {
            return;
        }

        let span = info_span!("close_session", session_id = %self.session_id);
        async move {
            self.phase = SessionPhase::Closing;

            if let Some(mut controller) = self.controller.take() {
                let state = controller.get_state();
                if let Err(err) =
                    checkpoint_manager::save_state(&self.session_id, &state, self.state_store.as_ref())
                        .await
                {
                    warn!(%err, "failed to save execution state");
                }
                if let Err(err) = controller.close().await {
                    warn!(%err, "controller close failed");
                }
            }

            if let Some(mut runtime) = self.runtime.take() {
                if let Err(err) = runtime.close().await {
                    warn!(%err, runtime = runtime.name(), "runtime close failed");
                }
            }

            if let Some(mut analyzer) = self.analyzer.take() {
                if let Err(err) = analyzer.close().await {
                    warn!(%err, analyzer = analyzer.name(), "security analyzer close failed");
                }
            }

            self.phase = SessionPhase::Closed;
            info!("session closed");
        }
        .instrument(span)
        .await;
    }

    fn transition(&mut self, next: SessionPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            let message = format!(
                "session '{}' cannot move from {} to {}",
                self.session_id,
                self.phase.as_str(),
                next.as_str()
            );
            return Err(if self.phase.is_shutting_down() {
                AppError::AlreadyClosed(message)
            } else {
                AppError::AlreadyStarted(message)
            });
        }
        debug!(from = self.phase.as_str(), to = next.as_str(), "session phase changed");
        self.phase = next;
        Ok(())
    }

    fn create_security_analyzer(&mut self, config: &GlobalConfig) {
        let name = config.security.security_analyzer.as_deref();
        self.analyzer = self.factories.analyzers.create(name, &self.event_stream);
        if self.analyzer.is_none() {
            debug!("no security analyzer configured");
        }
    }

    async fn create_runtime(
        &mut self,
        constructor: &RuntimeConstructor,
        config: Arc<GlobalConfig>,
        agent: &Agent,
    ) -> Result<()> {
        if self.runtime.is_some() {
            return Err(AppError::RuntimeAlreadyExists(format!(
                "session '{}' already has a runtime",
                self.session_id
            )));
        }

        let params = RuntimeParams {
            config,
            event_stream: Arc::clone(&self.event_stream),
            session_id: self.session_id.clone(),
            plugins: agent.sandbox_plugins.clone(),
        };

        // Stored before initialization so a failed init is still closed.
        let runtime = self.runtime.insert(constructor(params));
        runtime.initialize().await?;

        info!(runtime = runtime.name(), plugins = ?agent.sandbox_plugins, "runtime initialized");
        Ok(())
    }

    async fn create_controller(
        &mut self,
        agent: Arc<Agent>,
        config: &GlobalConfig,
        max_iterations: u32,
        max_budget_per_task: Option<f64>,
        agent_to_llm_config: Option<HashMap<String, LlmConfig>>,
    ) -> Result<()> {
        if !self.runtime.as_ref().is_some_and(|runtime| runtime.is_ready()) {
            return Err(AppError::RuntimeNotReady(format!(
                "session '{}' has no initialized runtime",
                self.session_id
            )));
        }
        if self.controller.is_some() {
            return Err(AppError::ControllerAlreadyExists(format!(
                "session '{}' already has a controller",
                self.session_id
            )));
        }

        let confirmation_mode = config.security.confirmation_mode;
        let params = ControllerParams {
            session_id: self.session_id.clone(),
            event_stream: Arc::clone(&self.event_stream),
            agent,
            max_iterations,
            max_budget_per_task,
            agent_to_llm_config,
            confirmation_mode,
            headless_mode: false,
        };
        let controller = self.factories.controllers.create(params).await?;
        let controller = self.controller.insert(controller);

        match checkpoint_manager::restore_state(&self.session_id, self.state_store.as_ref()).await {
            Ok(state) => {
                controller.set_initial_state(state, max_iterations, confirmation_mode);
            }
            Err(AppError::NotFound(_)) => {
                info!("no saved execution state, starting fresh");
            }
            Err(err) => {
                warn!(%err, "failed to restore execution state, starting fresh");
            }
        }

        info!(max_iterations, confirmation_mode, "controller created");
        Ok(())
    }
}
