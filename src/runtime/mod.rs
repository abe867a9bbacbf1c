//! Sandboxed execution runtime abstraction and strict name-based selection.

pub mod local;

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::GlobalConfig;
use crate::events::EventStream;
use crate::{AppError, BoxFuture, Result};

pub use local::{workspace_dir_name, LocalRuntime};

/// Everything a runtime is constructed with.
#[derive(Debug, Clone)]
pub struct RuntimeParams {
    /// Full application configuration.
    pub config: Arc<GlobalConfig>,
    /// Session event stream.
    pub event_stream: Arc<EventStream>,
    /// Owning session id.
    pub session_id: String,
    /// Sandbox plugins the agent requires.
    pub plugins: Vec<String>,
}

/// Sandboxed environment agent actions run against.
///
/// A runtime is unusable until [`initialize`](Runtime::initialize) has
/// completed.
pub trait Runtime: Send + Sync {
    /// Registered name of the implementation.
    fn name(&self) -> &str;

    /// Whether initialization completed and the runtime is not closed.
    fn is_ready(&self) -> bool;

    /// Bring the sandbox up.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Runtime` if the sandbox cannot be prepared.
    fn initialize(&mut self) -> BoxFuture<'_, ()>;

    /// Tear the sandbox down.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Runtime` if teardown fails.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Constructor stored in a [`RuntimeRegistry`].
pub type RuntimeConstructor = Arc<dyn Fn(RuntimeParams) -> Box<dyn Runtime> + Send + Sync>;

/// Maps runtime names to constructors.
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    constructors: HashMap<String, RuntimeConstructor>,
}

impl RuntimeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in runtimes registered.
    ///
    /// This registers [`LocalRuntime`] under `"local"`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(LocalRuntime::NAME, |params: RuntimeParams| {
            Box::new(LocalRuntime::new(params)) as Box<dyn Runtime>
        });
        registry
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(RuntimeParams) -> Box<dyn Runtime> + Send + Sync + 'static,
    {
        self.constructors.insert(name.into(), Arc::new(constructor));
    }

    /// Whether a constructor is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Look up the constructor for `name` without constructing anything.
    ///
    /// # Errors
    ///
    /// Returns `AppError::UnknownRuntime` if `name` is not registered.
    pub fn resolve(&self, name: &str) -> Result<RuntimeConstructor> {
        self.constructors.get(name).cloned().ok_or_else(|| {
            AppError::UnknownRuntime(format!(
                "'{name}' is not registered (available: {})",
                self.names().join(", ")
            ))
        })
    }
}
