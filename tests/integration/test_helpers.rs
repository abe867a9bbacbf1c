//! Shared test helpers for session-level integration tests.
//!
//! Provides recording doubles for every subsystem, all writing into one
//! shared [`CallLog`], so tests can assert construction and teardown
//! order. Each double can be told to fail through [`Failures`].

use std::sync::{Arc, Mutex};

use agent_session::config::GlobalConfig;
use agent_session::controller::{Controller, ControllerFactory, ControllerParams};
use agent_session::events::EventStream;
use agent_session::models::agent::Agent;
use agent_session::models::state::{AgentState, ExecutionState};
use agent_session::orchestrator::{AgentSession, SubsystemFactories};
use agent_session::persistence::{MemoryStateStore, StateStore};
use agent_session::runtime::{Runtime, RuntimeParams};
use agent_session::security::SecurityAnalyzer;
use agent_session::{AppError, BoxFuture, Result};

/// Name the recording runtime and analyzer are registered under.
pub const RECORDING: &str = "recording";

/// Ordered record of subsystem calls shared by all doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Only the `*.close` entries, in order.
    pub fn closes(&self) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.ends_with(".close"))
            .collect()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// Which recording doubles should fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Failures {
    pub runtime_initialize: bool,
    pub runtime_close: bool,
    pub controller_close: bool,
    pub analyzer_close: bool,
    pub store_save: bool,
    pub store_restore: bool,
}

// ─── Runtime ─────────────────────────────────────────────────────────

pub struct RecordingRuntime {
    log: CallLog,
    failures: Failures,
    ready: bool,
}

impl Runtime for RecordingRuntime {
    fn name(&self) -> &str {
        RECORDING
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn initialize(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.log.push("runtime.initialize");
            if self.failures.runtime_initialize {
                return Err(AppError::Runtime("sandbox unavailable".into()));
            }
            self.ready = true;
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.log.push("runtime.close");
            self.ready = false;
            if self.failures.runtime_close {
                return Err(AppError::Runtime("sandbox teardown failed".into()));
            }
            Ok(())
        })
    }
}

// ─── Analyzer ────────────────────────────────────────────────────────

pub struct RecordingAnalyzer {
    log: CallLog,
    failures: Failures,
}

impl SecurityAnalyzer for RecordingAnalyzer {
    fn name(&self) -> &str {
        RECORDING
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.log.push("analyzer.close");
            if self.failures.analyzer_close {
                return Err(AppError::Analyzer("analyzer teardown failed".into()));
            }
            Ok(())
        })
    }
}

// ─── Controller ──────────────────────────────────────────────────────

pub struct RecordingController {
    log: CallLog,
    failures: Failures,
    state: ExecutionState,
}

impl Controller for RecordingController {
    fn get_state(&self) -> ExecutionState {
        self.log.push("controller.get_state");
        self.state.clone()
    }

    fn set_initial_state(
        &mut self,
        state: ExecutionState,
        max_iterations: u32,
        confirmation_mode: bool,
    ) {
        self.log.push("controller.set_initial_state");
        self.state = state;
        self.state.max_iterations = max_iterations;
        self.state.confirmation_mode = confirmation_mode;
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.log.push("controller.close");
            self.state.agent_state = AgentState::Stopped;
            if self.failures.controller_close {
                return Err(AppError::Controller("controller teardown failed".into()));
            }
            Ok(())
        })
    }
}

/// Controller factory that also keeps the last params it was given.
#[derive(Clone, Default)]
pub struct RecordingControllerFactory {
    log: CallLog,
    failures: Failures,
    last_params: Arc<Mutex<Option<ControllerParams>>>,
}

impl RecordingControllerFactory {
    pub fn last_params(&self) -> Option<ControllerParams> {
        self.last_params.lock().unwrap().clone()
    }
}

impl ControllerFactory for RecordingControllerFactory {
    fn create(&self, params: ControllerParams) -> BoxFuture<'_, Box<dyn Controller>> {
        Box::pin(async move {
            self.log.push("controller.new");
            let state = ExecutionState::new(
                params.session_id.clone(),
                params.max_iterations,
                params.confirmation_mode,
            );
            *self.last_params.lock().unwrap() = Some(params);
            Ok(Box::new(RecordingController {
                log: self.log.clone(),
                failures: self.failures,
                state,
            }) as Box<dyn Controller>)
        })
    }
}

// ─── State store ─────────────────────────────────────────────────────

/// Memory store that logs calls and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inner: MemoryStateStore,
    log: CallLog,
    failures: Failures,
}

impl RecordingStore {
    pub fn new(log: &CallLog, failures: Failures) -> Self {
        Self {
            inner: MemoryStateStore::new(),
            log: log.clone(),
            failures,
        }
    }
}

impl StateStore for RecordingStore {
    fn save(&self, session_id: &str, blob: Vec<u8>) -> BoxFuture<'_, ()> {
        let session_id = session_id.to_owned();
        Box::pin(async move {
            self.log.push("store.save");
            if self.failures.store_save {
                return Err(AppError::Db("disk full".into()));
            }
            self.inner.save(&session_id, blob).await
        })
    }

    fn restore(&self, session_id: &str) -> BoxFuture<'_, Vec<u8>> {
        let session_id = session_id.to_owned();
        Box::pin(async move {
            self.log.push("store.restore");
            if self.failures.store_restore {
                return Err(AppError::Db("database is locked".into()));
            }
            self.inner.restore(&session_id).await
        })
    }

    fn delete(&self, session_id: &str) -> BoxFuture<'_, ()> {
        let session_id = session_id.to_owned();
        Box::pin(async move { self.inner.delete(&session_id).await })
    }
}

// ─── Builders ────────────────────────────────────────────────────────

/// Everything a recording session is built from, kept for assertions.
pub struct Recording {
    pub log: CallLog,
    pub store: Arc<RecordingStore>,
    pub controllers: RecordingControllerFactory,
    pub factories: SubsystemFactories,
}

impl Recording {
    pub fn new(failures: Failures) -> Self {
        let log = CallLog::default();
        let store = Arc::new(RecordingStore::new(&log, failures));
        let controllers = RecordingControllerFactory {
            log: log.clone(),
            failures,
            last_params: Arc::default(),
        };

        let mut factories = SubsystemFactories::with_defaults();
        let analyzer_log = log.clone();
        factories
            .analyzers
            .register(RECORDING, move |_stream: Arc<EventStream>| {
                analyzer_log.push("analyzer.new");
                Box::new(RecordingAnalyzer {
                    log: analyzer_log.clone(),
                    failures,
                }) as Box<dyn SecurityAnalyzer>
            });
        let runtime_log = log.clone();
        factories
            .runtimes
            .register(RECORDING, move |_params: RuntimeParams| {
                runtime_log.push("runtime.new");
                Box::new(RecordingRuntime {
                    log: runtime_log.clone(),
                    failures,
                    ready: false,
                }) as Box<dyn Runtime>
            });
        factories.controllers = Arc::new(controllers.clone());

        Self {
            log,
            store,
            controllers,
            factories,
        }
    }

    pub fn session(&self, session_id: &str) -> AgentSession {
        AgentSession::with_factories(
            session_id,
            Arc::clone(&self.store) as Arc<dyn StateStore>,
            self.factories.clone(),
        )
    }
}

/// Minimal valid configuration rooted at `workspace_base`, optionally
/// naming a security analyzer.
pub fn test_config(workspace_base: &std::path::Path, analyzer: Option<&str>) -> Arc<GlobalConfig> {
    let mut config = GlobalConfig::from_toml_str(
        r#"
[llm]
model = "test-model"

[agent]
name = "CodeActAgent"
sandbox_plugins = ["jupyter"]
"#,
    )
    .expect("valid test config");
    config.sandbox.workspace_base = workspace_base.to_path_buf();
    config.security.security_analyzer = analyzer.map(str::to_owned);
    Arc::new(config)
}

pub fn test_agent(config: &GlobalConfig) -> Arc<Agent> {
    Arc::new(Agent::from_config(config))
}

/// Start `session` with `runtime`, the config's agent, and a ceiling of
/// ten iterations.
pub async fn start_session(
    session: &mut AgentSession,
    runtime: &str,
    config: &Arc<GlobalConfig>,
) -> Result<()> {
    session
        .start(
            runtime,
            Arc::clone(config),
            test_agent(config),
            10,
            None,
            None,
        )
        .await
}

/// Execution state at `iteration`, ready to seed a controller.
pub fn state_at(session_id: &str, iteration: u32) -> ExecutionState {
    let mut state = ExecutionState::new(session_id, 10, false);
    state.iteration = iteration;
    state.agent_state = AgentState::Running;
    state
}
