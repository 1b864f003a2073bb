//! Per-section content schema: required/optional fields, string bounds,
//! array bounds. Extra fields are rejected.

use serde_json::Value;

use sitepilot_types::site::SectionType;

use super::catalog::{Field, Shape, content_fields};
use super::{Violations, join_path};

/// Check a content object against the shape for `section_type`.
///
/// Returns the value unchanged when it conforms.
pub fn validate_content(section_type: SectionType, content: &Value) -> Result<Value, Violations> {
    let mut violations = Vec::new();
    check_object(content_fields(section_type), content, "", &mut violations);
    if violations.is_empty() {
        Ok(content.clone())
    } else {
        Err(violations)
    }
}

fn label(path: &str) -> &str {
    if path.is_empty() { "content" } else { path }
}

fn check_object(fields: &[Field], value: &Value, path: &str, out: &mut Violations) {
    let Some(map) = value.as_object() else {
        out.push(format!("{}: expected an object", label(path)));
        return;
    };

    for key in map.keys() {
        if !fields.iter().any(|f| f.name == key) {
            out.push(format!("{}: unexpected field", join_path(path, key)));
        }
    }

    for field in fields {
        let field_path = join_path(path, field.name);
        match map.get(field.name) {
            None | Some(Value::Null) if field.required => {
                out.push(format!("{field_path}: required field is missing"));
            }
            None | Some(Value::Null) => {}
            Some(v) => check_shape(&field.shape, v, &field_path, out),
        }
    }
}

fn check_shape(shape: &Shape, value: &Value, path: &str, out: &mut Violations) {
    match shape {
        Shape::Text(max) => match value.as_str() {
            None => out.push(format!("{path}: expected a string")),
            Some(s) if s.trim().is_empty() => out.push(format!("{path}: must not be empty")),
            Some(s) => {
                let len = s.chars().count();
                if len > *max {
                    out.push(format!("{path}: {len} characters exceeds the limit of {max}"));
                }
            }
        },
        Shape::Object(fields) => check_object(fields, value, path, out),
        Shape::List { min, max, item } => match value.as_array() {
            None => out.push(format!("{path}: expected an array")),
            Some(items) => {
                if items.len() < *min || items.len() > *max {
                    out.push(format!(
                        "{path}: expected {min} to {max} items, found {}",
                        items.len()
                    ));
                }
                for (i, v) in items.iter().enumerate() {
                    check_shape(item, v, &format!("{path}[{i}]"), out);
                }
            }
        },
    }
}
