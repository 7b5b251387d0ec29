//! Task lifecycle orchestration services.

pub mod lifecycle;

pub use lifecycle::{
    CreateTaskRequest, TaskFilters, TaskLifecycleError, TaskLifecycleResult, TaskLifecycleService,
};
