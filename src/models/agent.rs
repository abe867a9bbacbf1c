//! Agent descriptor handed to the runtime and controller.

use serde::{Deserialize, Serialize};

use crate::config::{GlobalConfig, LlmConfig};

/// Capabilities and bindings of the agent driven by a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    /// Agent implementation name.
    pub name: String,
    /// Sandbox plugins the runtime must provide before the agent can act.
    pub sandbox_plugins: Vec<String>,
    /// Model binding used by the agent.
    pub llm: LlmConfig,
}

impl Agent {
    /// Construct an agent descriptor.
    #[must_use]
    pub fn new(name: impl Into<String>, sandbox_plugins: Vec<String>, llm: LlmConfig) -> Self {
        Self {
            name: name.into(),
            sandbox_plugins,
            llm,
        }
    }

    /// Build the descriptor for the `[agent]` section, preferring a
    /// per-agent model override from `[agents.<name>]` when present.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        let llm = config
            .agents
            .get(&config.agent.name)
            .unwrap_or(&config.llm)
            .clone();
        Self::new(
            config.agent.name.clone(),
            config.agent.sandbox_plugins.clone(),
            llm,
        )
    }

    /// Whether the agent requires the named sandbox plugin.
    #[must_use]
    pub fn requires_plugin(&self, plugin: &str) -> bool {
        self.sandbox_plugins.iter().any(|p| p == plugin)
    }
}

/// Summary of an agent suitable for event payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentSummary {
    /// Agent implementation name.
    pub name: String,
    /// Model identifier.
    pub model: String,
}

impl From<&Agent> for AgentSummary {
    fn from(agent: &Agent) -> Self {
        Self {
            name: agent.name.clone(),
            model: agent.llm.model.clone(),
        }
    }
}
