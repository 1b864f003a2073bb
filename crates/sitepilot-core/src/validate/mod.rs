//! Pure validators: section catalog, per-section content schema, content
//! policy filter, and the site-plan grammar.
//!
//! Every validator returns either a typed value or a list of human-readable
//! violations. None of them perform I/O.

pub mod catalog;
pub mod content_schema;
pub mod plan_grammar;
pub mod policy;

/// Human-readable violation messages from a validator.
pub type Violations = Vec<String>;

use serde_json::Value;
use sitepilot_types::site::SectionType;

/// Full content check for one section: shape first, then policy.
pub fn validate_section_content(
    section_type: SectionType,
    content: &Value,
) -> Result<Value, Violations> {
    let value = content_schema::validate_content(section_type, content)?;
    policy::check_policy(&value)?;
    Ok(value)
}

/// Join a JSON path segment onto a parent path.
pub(crate) fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
