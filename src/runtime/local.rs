//! Runtime executing agent actions in a per-session directory on the host.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use super::{Runtime, RuntimeParams};
use crate::events::EventSource;
use crate::{AppError, BoxFuture, Result};

/// Plugins the local runtime knows how to provide.
pub const SUPPORTED_PLUGINS: &[&str] = &["jupyter", "agent_skills"];

/// Directory name for `session_id` under the workspace base.
///
/// ASCII letters, digits, `-` and `_` are kept; every other byte is
/// written as `%XX`, so any session id maps to exactly one directory
/// directly below the base and distinct ids never collide.
#[must_use]
pub fn workspace_dir_name(session_id: &str) -> String {
    let mut name = String::with_capacity(session_id.len());
    for byte in session_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            name.push(char::from(byte));
        } else {
            let _ = write!(name, "%{byte:02X}");
        }
    }
    name
}

/// Host-directory sandbox rooted at
/// `<workspace_base>/<workspace_dir_name(session_id)>`.
#[derive(Debug)]
pub struct LocalRuntime {
    params: RuntimeParams,
    workspace: PathBuf,
    ready: bool,
    closed: bool,
}

impl LocalRuntime {
    /// Registered name of the local runtime.
    pub const NAME: &'static str = "local";

    /// Construct the runtime; nothing touches the file system until
    /// [`initialize`](Runtime::initialize).
    #[must_use]
    pub fn new(params: RuntimeParams) -> Self {
        let workspace = params
            .config
            .sandbox
            .workspace_base
            .join(workspace_dir_name(&params.session_id));
        Self {
            params,
            workspace,
            ready: false,
            closed: false,
        }
    }

    /// Directory the session's actions run in.
    #[must_use]
    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Plugins loaded for the agent.
    #[must_use]
    pub fn plugins(&self) -> &[String] {
        &self.params.plugins
    }

    fn check_session_id(&self) -> Result<()> {
        if self.params.session_id.is_empty() {
            return Err(AppError::Runtime(
                "an empty session id cannot name a workspace directory".into(),
            ));
        }
        Ok(())
    }

    fn check_plugins(&self) -> Result<()> {
        if let Some(plugin) = self
            .params
            .plugins
            .iter()
            .find(|plugin| !SUPPORTED_PLUGINS.contains(&plugin.as_str()))
        {
            return Err(AppError::Runtime(format!(
                "plugin '{plugin}' is not supported by the local runtime"
            )));
        }
        Ok(())
    }
}

impl Runtime for LocalRuntime {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn is_ready(&self) -> bool {
        self.ready && !self.closed
    }

    fn initialize(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return Err(AppError::Runtime("runtime already closed".into()));
            }
            if self.ready {
                return Ok(());
            }

            self.check_session_id()?;
            self.check_plugins()?;

            tokio::fs::create_dir_all(&self.workspace)
                .await
                .map_err(|err| {
                    AppError::Runtime(format!(
                        "failed to create workspace {}: {err}",
                        self.workspace.display()
                    ))
                })?;

            self.params
                .event_stream
                .append(
                    EventSource::Environment,
                    json!({
                        "kind": "runtime_initialized",
                        "runtime": Self::NAME,
                        "workspace": self.workspace.display().to_string(),
                        "plugins": self.params.plugins,
                    }),
                )
                .await;

            self.ready = true;
            info!(
                session_id = %self.params.session_id,
                workspace = %self.workspace.display(),
                plugins = ?self.params.plugins,
                "local runtime initialized"
            );
            Ok(())
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return Ok(());
            }

            self.params
                .event_stream
                .append(
                    EventSource::Environment,
                    json!({ "kind": "runtime_closed", "runtime": Self::NAME }),
                )
                .await;

            self.ready = false;
            self.closed = true;
            info!(session_id = %self.params.session_id, "local runtime closed");
            Ok(())
        })
    }
}
