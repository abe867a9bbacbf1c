//! Persistence layer modules.
//!
//! The orchestrator only sees the [`StateStore`] trait; `SQLite` and
//! in-memory bindings implement it.

pub mod db;
pub mod memory;
pub mod retention;
pub mod schema;
pub mod state_repo;
pub mod store;

pub use memory::MemoryStateStore;
pub use state_repo::SqliteStateStore;
pub use store::StateStore;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
