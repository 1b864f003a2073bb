use sitepilot_types::audit::{AuditArea, AuditFinding, Severity};
use sitepilot_types::site::PageKind;

use super::{WithRecommendation, finding};
use crate::validate::plan_grammar::check_page_sections;
use crate::view::SiteView;

/// Pages longer than this lose visitors before the end.
pub const MAX_SECTIONS_PER_PAGE: usize = 6;

pub fn check(view: &SiteView<'_>) -> Vec<AuditFinding> {
    let mut out = Vec::new();

    if !view.data.has_page(PageKind::Home) {
        out.push(
            finding(
                Severity::High,
                AuditArea::Structure,
                "The site has no home page.",
                "Every visit that does not deep-link lands on the home page.",
            )
            .suggest("Build a plan that starts with a home page."),
        );
    }

    for page in &view.data.pages {
        let count = page.sections.len();
        if count > MAX_SECTIONS_PER_PAGE {
            out.push(
                finding(
                    Severity::Low,
                    AuditArea::Structure,
                    format!("The {} page has {count} sections.", page.kind),
                    "Long pages bury the call to action.",
                )
                .suggest("Merge or drop the weakest sections."),
            );
        }

        if count == 1 && page.sections[0].section_type.is_hero() {
            out.push(finding(
                Severity::Medium,
                AuditArea::Structure,
                format!("The {} page is only a hero.", page.kind),
                "A page with nothing below the fold gives visitors no reason to stay.",
            ));
        }

        for violation in check_page_sections(page.kind, &page.section_types()) {
            out.push(finding(
                Severity::High,
                AuditArea::Structure,
                format!("Section order breaks the page rules: {violation}."),
                "Pages outside the section grammar render unpredictably.",
            ));
        }
    }

    out
}
