//! Capability resolver port, a consumed collaborator.
//!
//! Which capabilities a task type requires and which a user holds is
//! maintained entirely outside this core. The lifecycle service only needs
//! two projections of that data to answer list filters, so the seam is two
//! lookups returning task type sets.

use crate::task::domain::{CapabilityId, ProjectId, TaskTypeId, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// Result type for capability lookups.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Errors returned by capability resolver implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CapabilityError {
    /// The lookup against the external capability source failed.
    #[error("capability lookup failed: {0}")]
    Lookup(String),
}

/// External lookup of capability-to-type and user-to-type mappings.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CapabilityResolver: Send + Sync {
    /// Returns the task types tagged with the given capability within a
    /// project. Unknown capabilities resolve to the empty set.
    async fn type_ids_with_capability(
        &self,
        capability_id: CapabilityId,
        project_id: ProjectId,
    ) -> CapabilityResult<Vec<TaskTypeId>>;

    /// Returns the task types whose required capabilities are all held by
    /// the given user within a project.
    async fn workable_type_ids(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> CapabilityResult<Vec<TaskTypeId>>;
}
