//! Task lifecycle management for Crewboard.
//!
//! This module implements the task state machine and everything a transition
//! touches: creating tasks, claiming and releasing them, starting active
//! work, and completing them. Transitions are guarded by optimistic
//! concurrency versioning, append one audit event each, and — on completion
//! — invoke the automation executor inside the same storage transaction.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
