//! Global configuration parsing and validation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{AppError, Result};

/// Security settings consumed when the analyzer and controller are built.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SecurityConfig {
    /// Registered analyzer name. Absent means "no analyzer", which is
    /// distinct from an unknown name (that falls back to the base analyzer).
    #[serde(default)]
    pub security_analyzer: Option<String>,
    /// Whether agent actions require user confirmation before execution.
    #[serde(default)]
    pub confirmation_mode: bool,
}

/// Sandbox settings for runtime implementations.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SandboxConfig {
    /// Directory under which each session gets its own workspace.
    #[serde(default = "default_workspace_base")]
    pub workspace_base: PathBuf,
    /// Per-command timeout inside the sandbox.
    #[serde(default = "default_sandbox_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            workspace_base: default_workspace_base(),
            timeout_seconds: default_sandbox_timeout(),
        }
    }
}

/// Language model binding for an agent.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f64,
    /// Optional cap on generated tokens per completion.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

/// Agent descriptor settings used by the hosting binary.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Agent implementation name.
    pub name: String,
    /// Sandbox plugins the agent requires from the runtime.
    #[serde(default)]
    pub sandbox_plugins: Vec<String>,
}

fn default_runtime() -> String {
    "local".into()
}

fn default_max_iterations() -> u32 {
    100
}

fn default_retention_days() -> u32 {
    30
}

fn default_workspace_base() -> PathBuf {
    std::env::temp_dir().join("agent-session")
}

fn default_sandbox_timeout() -> u64 {
    120
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Default runtime selector.
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Iteration ceiling handed to every controller.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Optional spend ceiling per task.
    #[serde(default)]
    pub max_budget_per_task: Option<f64>,
    /// Explicit path of the `SQLite` state database.
    #[serde(default)]
    pub state_db: Option<PathBuf>,
    /// Days a persisted execution state survives without being updated.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Security analyzer and confirmation settings.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Sandbox settings.
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Default language model binding.
    pub llm: LlmConfig,
    /// Agent launched by the hosting binary.
    pub agent: AgentConfig,
    /// Per-agent language model overrides keyed by agent name.
    #[serde(default)]
    pub agents: HashMap<String, LlmConfig>,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and validate it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Per-agent model overrides, or `None` when none are configured.
    #[must_use]
    pub fn agent_to_llm_config(&self) -> Option<HashMap<String, LlmConfig>> {
        if self.agents.is_empty() {
            None
        } else {
            Some(self.agents.clone())
        }
    }

    /// Path of the `SQLite` state database.
    #[must_use]
    pub fn state_db_path(&self) -> PathBuf {
        self.state_db.clone().unwrap_or_else(|| {
            self.sandbox
                .workspace_base
                .join(".agent-session")
                .join("state.db")
        })
    }

    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AppError::Config(
                "max_iterations must be greater than zero".into(),
            ));
        }

        if let Some(budget) = self.max_budget_per_task {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(AppError::Config(
                    "max_budget_per_task must be a positive number".into(),
                ));
            }
        }

        if self.llm.model.trim().is_empty() {
            return Err(AppError::Config("llm.model must not be empty".into()));
        }

        if let Some((name, _)) = self
            .agents
            .iter()
            .find(|(_, llm)| llm.model.trim().is_empty())
        {
            return Err(AppError::Config(format!(
                "agents.{name}.model must not be empty"
            )));
        }

        if self.agent.name.trim().is_empty() {
            return Err(AppError::Config("agent.name must not be empty".into()));
        }

        Ok(())
    }
}
