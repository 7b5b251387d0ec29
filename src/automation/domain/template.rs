//! Task templates and title rendering.

use super::TemplateId;
use crate::task::domain::{Task, TaskTypeId};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Matches `{{placeholder}}` with optional inner whitespace.
#[expect(clippy::expect_used, reason = "placeholder pattern is a checked literal")]
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("valid placeholder pattern"));

/// A title pattern used to materialise a derived task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTemplate {
    /// Template identifier.
    pub id: TemplateId,
    /// Title pattern; may embed `{{father}}` to reference the source task.
    pub title_template: String,
    /// Type assigned to the derived task.
    pub target_type_id: TaskTypeId,
}

impl TaskTemplate {
    /// Creates a template producing tasks of the given type.
    #[must_use]
    pub fn new(title_template: impl Into<String>, target_type_id: TaskTypeId) -> Self {
        Self {
            id: TemplateId::new(),
            title_template: title_template.into(),
            target_type_id,
        }
    }

    /// Renders this template's title against a source task.
    #[must_use]
    pub fn rendered_title(&self, source: &Task) -> String {
        render_title(&self.title_template, source)
    }
}

/// Substitutes known placeholders in a template string with values derived
/// from the source task.
///
/// `{{father}}` becomes a stable back-reference to the source task (its id
/// and title) so a reader can trace lineage. Unrecognised placeholders are
/// left in place verbatim rather than dropped or rejected; a typo in an
/// admin-authored template should produce an odd title, not a failed
/// completion.
#[must_use]
pub fn render_title(template: &str, source: &Task) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let name = caps.get(1).map_or("", |m| m.as_str());
            if name == "father" {
                father_reference(source)
            } else {
                caps.get(0).map_or_else(String::new, |m| m.as_str().to_owned())
            }
        })
        .into_owned()
}

/// Builds the textual back-reference to a source task.
fn father_reference(source: &Task) -> String {
    format!("[Task #{}] {}", source.id(), source.title())
}
