//! Static capability resolver for tests and local wiring.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::task::{
    domain::{CapabilityId, ProjectId, TaskTypeId, UserId},
    ports::{CapabilityResolver, CapabilityResult},
};

/// Capability resolver backed by fixed lookup tables.
///
/// Unknown capabilities and users resolve to empty type sets, mirroring an
/// external directory that simply has no rows for them.
#[derive(Debug, Clone, Default)]
pub struct StaticCapabilityResolver {
    tagged: HashMap<CapabilityId, Vec<TaskTypeId>>,
    workable: HashMap<UserId, Vec<TaskTypeId>>,
}

impl StaticCapabilityResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags task types with a capability.
    #[must_use]
    pub fn with_capability(
        mut self,
        capability_id: CapabilityId,
        type_ids: Vec<TaskTypeId>,
    ) -> Self {
        self.tagged.insert(capability_id, type_ids);
        self
    }

    /// Declares the task types a user can work.
    #[must_use]
    pub fn with_workable(mut self, user_id: UserId, type_ids: Vec<TaskTypeId>) -> Self {
        self.workable.insert(user_id, type_ids);
        self
    }
}

#[async_trait]
impl CapabilityResolver for StaticCapabilityResolver {
    async fn type_ids_with_capability(
        &self,
        capability_id: CapabilityId,
        _project_id: ProjectId,
    ) -> CapabilityResult<Vec<TaskTypeId>> {
        Ok(self.tagged.get(&capability_id).cloned().unwrap_or_default())
    }

    async fn workable_type_ids(
        &self,
        user_id: UserId,
        _project_id: ProjectId,
    ) -> CapabilityResult<Vec<TaskTypeId>> {
        Ok(self.workable.get(&user_id).cloned().unwrap_or_default())
    }
}
