//! Port contracts for the task lifecycle engine.

pub mod capability;
pub mod store;

pub use capability::{CapabilityError, CapabilityResolver, CapabilityResult};
pub use store::{StoreResult, StoreTxn, TaskStore, TaskStoreError};
