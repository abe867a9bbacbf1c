//! Security analyzer abstraction and name-based selection.
//!
//! Selection is deliberately lenient: an absent analyzer name means "no
//! analyzer", while an unrecognized name degrades to [`BaseAnalyzer`]
//! instead of failing. Runtime selection is strict by contrast (see
//! [`RuntimeRegistry`](crate::runtime::RuntimeRegistry)).

pub mod audit;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::events::EventStream;
use crate::BoxFuture;

pub use audit::AuditAnalyzer;

/// Component evaluating proposed agent actions for risk.
pub trait SecurityAnalyzer: Send + Sync {
    /// Registered name of the implementation.
    fn name(&self) -> &str;

    /// Release any resources held by the analyzer.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Analyzer` if teardown fails.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// No-op analyzer used when a configured name is not registered.
#[derive(Debug)]
pub struct BaseAnalyzer {
    session_id: String,
}

impl BaseAnalyzer {
    /// Registered name of the base analyzer.
    pub const NAME: &'static str = "base";

    /// Create a base analyzer bound to the session's event stream.
    #[must_use]
    pub fn new(event_stream: &EventStream) -> Self {
        Self {
            session_id: event_stream.session_id().to_owned(),
        }
    }
}

impl SecurityAnalyzer for BaseAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            debug!(session_id = %self.session_id, "base analyzer closed");
            Ok(())
        })
    }
}

/// Constructor stored in an [`AnalyzerRegistry`].
pub type AnalyzerConstructor =
    Arc<dyn Fn(Arc<EventStream>) -> Box<dyn SecurityAnalyzer> + Send + Sync>;

/// Maps configured analyzer names to constructors.
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    constructors: HashMap<String, AnalyzerConstructor>,
}

impl AnalyzerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in analyzers registered.
    ///
    /// This registers [`AuditAnalyzer`] under `"audit"`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(AuditAnalyzer::NAME, |stream: Arc<EventStream>| {
            Box::new(AuditAnalyzer::new(&stream)) as Box<dyn SecurityAnalyzer>
        });
        registry
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(Arc<EventStream>) -> Box<dyn SecurityAnalyzer> + Send + Sync + 'static,
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

    /// Build the analyzer selected by `name`.
    ///
    /// `None` yields no analyzer. An unregistered name yields a
    /// [`BaseAnalyzer`].
    #[must_use]
    pub fn create(
        &self,
        name: Option<&str>,
        event_stream: &Arc<EventStream>,
    ) -> Option<Box<dyn SecurityAnalyzer>> {
        let name = name?;
        let analyzer = if let Some(constructor) = self.constructors.get(name) {
            constructor(Arc::clone(event_stream))
        } else {
            warn!(
                analyzer = name,
                "security analyzer not registered, falling back to base analyzer"
            );
            Box::new(BaseAnalyzer::new(event_stream))
        };
        info!(
            session_id = event_stream.session_id(),
            analyzer = analyzer.name(),
            "security analyzer created"
        );
        Some(analyzer)
    }
}
