//! Automation services.

pub mod executor;

pub use executor::{run_completion_rules, RuleExecutionError};
