//! Rule execution receipts.

use super::RuleId;
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit and idempotency receipt for one rule firing on one source task.
///
/// At most one receipt exists per `(rule, source task)` pair; its presence
/// is what stops a retried or re-entrant trigger from deriving a second
/// set of tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleExecution {
    /// Rule that fired.
    pub rule_id: RuleId,
    /// Task whose completion triggered the rule.
    pub source_task_id: TaskId,
    /// When the rule fired.
    pub executed_at: DateTime<Utc>,
}
