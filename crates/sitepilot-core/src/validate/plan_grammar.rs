//! Site-plan grammar.
//!
//! Per page: exactly one hero, and it comes first; at most one `ctaPrimary`,
//! and it comes last; no repeated section types; blog-only sections only on
//! the blog page; every section in the page's allow-list. No blog page when
//! the user ruled a blog out. A plan never carries copy or styling fields.

use serde_json::Value;

use sitepilot_types::contract::IntakeContract;
use sitepilot_types::plan::SitePlan;
use sitepilot_types::site::{PageKind, SectionType};

use super::catalog::{DISALLOWED_PLAN_KEYS, is_allowed};
use super::{Violations, join_path};

/// Validate a raw proposed plan and return it typed.
pub fn validate_plan(raw: &Value, intake: &IntakeContract) -> Result<SitePlan, Violations> {
    let mut violations = Vec::new();
    scan_disallowed_keys(raw, "", &mut violations);
    if !violations.is_empty() {
        return Err(violations);
    }

    let plan: SitePlan = serde_json::from_value(raw.clone())
        .map_err(|e| vec![format!("plan does not match the expected shape: {e}")])?;

    let violations = check_plan(&plan, intake.blog_excluded());
    if violations.is_empty() {
        Ok(plan)
    } else {
        Err(violations)
    }
}

/// Check the grammar of an already-typed plan.
pub fn check_plan(plan: &SitePlan, blog_excluded: bool) -> Violations {
    let mut violations = Vec::new();
    if plan.pages.is_empty() {
        violations.push("plan must contain at least one page".to_string());
    }
    if blog_excluded && plan.pages.contains_key(&PageKind::Blog) {
        violations.push("blog: the site must not have a blog page".to_string());
    }
    for (kind, page) in &plan.pages {
        if page.goal.trim().is_empty() {
            violations.push(format!("{kind}: page goal must not be empty"));
        }
        violations.extend(check_page_sections(*kind, &page.ordered_sections));
    }
    violations
}

/// Check one page's ordered section list.
///
/// Also used by the structural tools to keep the live site inside the grammar.
pub fn check_page_sections(page: PageKind, sections: &[SectionType]) -> Violations {
    let mut violations = Vec::new();

    let heroes = sections.iter().filter(|s| s.is_hero()).count();
    if heroes != 1 {
        violations.push(format!("{page}: must have exactly one hero section, found {heroes}"));
    }
    if heroes >= 1 && !sections.first().is_some_and(|s| s.is_hero()) {
        violations.push(format!("{page}: the hero section must come first"));
    }

    let ctas = sections.iter().filter(|s| **s == SectionType::CtaPrimary).count();
    if ctas > 1 {
        violations.push(format!("{page}: at most one ctaPrimary section is allowed"));
    }
    if ctas >= 1 && sections.last() != Some(&SectionType::CtaPrimary) {
        violations.push(format!("{page}: the ctaPrimary section must come last"));
    }

    for (i, section) in sections.iter().enumerate() {
        if sections[..i].contains(section) {
            violations.push(format!("{page}: section '{section}' appears more than once"));
        }
        if section.is_blog_only() && page != PageKind::Blog {
            violations.push(format!("{page}: section '{section}' is only allowed on the blog page"));
        } else if !is_allowed(page, *section) {
            violations.push(format!("{page}: section '{section}' is not allowed on this page"));
        }
    }

    violations
}

fn scan_disallowed_keys(value: &Value, path: &str, out: &mut Violations) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                let key_path = join_path(path, key);
                if DISALLOWED_PLAN_KEYS.contains(&key.to_ascii_lowercase().as_str()) {
                    out.push(format!("{key_path}: field '{key}' is not allowed in a structural plan"));
                }
                scan_disallowed_keys(item, &key_path, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                scan_disallowed_keys(item, &format!("{path}[{i}]"), out);
            }
        }
        _ => {}
    }
}
