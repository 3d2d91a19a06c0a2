//! telebugs-core library.
//!
//! Project-scoped read tools, report assembly, and triage mutations over a
//! Telebugs error-tracking database. Every tool takes a resolved
//! [`access::AuthContext`] and never returns rows outside its project scope.
//!
//! # Conventions
//!
//! - **Errors**: business outcomes are [`error::Reply`] values; storage faults
//!   are [`error::StoreError`] and propagate with `?`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod access;
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod tools;

#[cfg(test)]
mod fixtures;

pub use access::{AuthContext, Principal, ProjectScope};
pub use db::Store;
pub use error::{Rejection, Reply, StoreError, ToolResult, ValidationError};
