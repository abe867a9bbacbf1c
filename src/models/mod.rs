//! Domain model module declarations.

pub mod agent;
pub mod session;
pub mod state;
