#![forbid(unsafe_code)]

//! Lifecycle orchestration for agent execution sessions.
//!
//! An [`AgentSession`](orchestrator::agent_session::AgentSession) brings up a
//! security analyzer, a sandboxed runtime, and a reasoning-loop controller in
//! dependency order, restores the controller's execution state from a
//! [`StateStore`](persistence::StateStore), and tears everything down again
//! in reverse order.

use std::future::Future;
use std::pin::Pin;

pub mod config;
pub mod controller;
pub mod errors;
pub mod events;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod runtime;
pub mod security;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};

/// Boxed, `Send` future returned by the object-safe subsystem traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;
