#![forbid(unsafe_code)]

//! `agent-session`: hosts one agent session until interrupted.
//!
//! Bootstraps configuration, the `SQLite` state store and its retention
//! service, then starts a session for the configured agent and closes it
//! again (persisting its execution state) on Ctrl-C or SIGTERM.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use agent_session::models::agent::Agent;
use agent_session::orchestrator::{SessionManager, SubsystemFactories};
use agent_session::persistence::{db, retention, SqliteStateStore, StateStore};
use agent_session::{AppError, GlobalConfig, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "agent-session", about = "Agent session lifecycle host", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Session id to start or resume. A random id is generated when omitted.
    #[arg(long)]
    session_id: Option<String>,

    /// Override the configured runtime selector.
    #[arg(long)]
    runtime: Option<String>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("agent-session bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(runtime) = args.runtime {
        config.runtime = runtime;
    }
    let config = Arc::new(config);
    info!(runtime = %config.runtime, "configuration loaded");

    // ── Initialize state store ──────────────────────────
    let db_path = config.state_db_path();
    let db = Arc::new(db::connect(&db_path).await?);
    let store = Arc::new(SqliteStateStore::new(db));
    info!(path = %db_path.display(), "state store connected");

    // ── Start retention service ──────────────────────────
    let ct = CancellationToken::new();
    let retention_handle =
        retention::spawn_retention_task(Arc::clone(&store), config.retention_days, ct.clone());
    info!("retention service started");

    // ── Start the session ───────────────────────────────
    let manager = SessionManager::new(
        Arc::clone(&store) as Arc<dyn StateStore>,
        SubsystemFactories::with_defaults(),
    );
    let session_id = args
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let agent = Arc::new(Agent::from_config(&config));

    let session = manager.get_or_create(&session_id).await;
    let started = session
        .lock()
        .await
        .start(
            &config.runtime,
            Arc::clone(&config),
            agent,
            config.max_iterations,
            config.max_budget_per_task,
            config.agent_to_llm_config(),
        )
        .await;

    let outcome = match started {
        Ok(()) => {
            info!(session_id = %session_id, "session running; press Ctrl-C to stop");
            shutdown_signal().await;
            info!("shutdown signal received");
            Ok(())
        }
        Err(err) => {
            error!(session_id = %session_id, %err, "session failed to start");
            Err(err)
        }
    };

    // ── Graceful shutdown: persist state ────────────────
    manager.close_all().await;
    ct.cancel();
    if let Err(err) = retention_handle.await {
        error!(%err, "retention task failed");
    }
    info!("agent-session shut down");

    outcome
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
