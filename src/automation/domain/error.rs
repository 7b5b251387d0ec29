//! Error types for automation domain parsing.

use thiserror::Error;

/// Error returned while parsing trigger events from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown trigger event: {0}")]
pub struct ParseTriggerEventError(pub String);
