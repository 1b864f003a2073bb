use sitepilot_types::audit::{AuditArea, AuditFinding, Severity};

use super::{WithRecommendation, finding, headline};
use crate::scoring::candidates::LONG_HEADLINE;
use crate::validate::validate_section_content;
use crate::view::{SiteView, hero};

pub fn check(view: &SiteView<'_>) -> Vec<AuditFinding> {
    let mut out = Vec::new();

    let empty: Vec<String> = view
        .sections()
        .filter(|(_, s)| s.content.is_none())
        .map(|(page, s)| format!("{page}/{}", s.section_type))
        .collect();
    if !empty.is_empty() {
        out.push(
            finding(
                Severity::Medium,
                AuditArea::Content,
                format!("{} section(s) have no copy: {}.", empty.len(), empty.join(", ")),
                "Placeholder sections make the site look unfinished.",
            )
            .suggest("Draft copy for the empty sections, one at a time."),
        );
    }

    for (page, section) in view.sections() {
        let Some(content) = &section.content else {
            continue;
        };
        if let Err(violations) = validate_section_content(section.section_type, content) {
            out.push(finding(
                Severity::High,
                AuditArea::Content,
                format!(
                    "The {} section on the {page} page no longer passes validation: {}.",
                    section.section_type,
                    violations.join("; ")
                ),
                "Copy that breaks the section schema or the content policy may not render.",
            ));
        }
    }

    for page in &view.data.pages {
        let long = hero(page)
            .and_then(|s| headline(s.content.as_ref()))
            .filter(|h| h.chars().count() > LONG_HEADLINE);
        if let Some(h) = long {
            out.push(
                finding(
                    Severity::Low,
                    AuditArea::Content,
                    format!("The {} page headline is {} characters long.", page.kind, h.chars().count()),
                    "Visitors skim headlines; long ones get skipped.",
                )
                .suggest(format!("Keep it under {LONG_HEADLINE} characters.")),
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitepilot_types::contract::{IntakeContract, VoiceContract};

    use crate::audit::fixtures::healthy;

    #[test]
    fn test_empty_stale_and_long_copy() {
        let mut data = healthy();
        data.pages[0].sections[1].content = None;
        data.pages[0].sections[4].content = Some(json!({"heading": "Go", "body": "The best studio.", "buttonLabel": "Start"}));
        data.pages[0].sections[0].content = Some(json!({
            "headline": "Bookkeeping and tax preparation for small creative studios across the region",
            "subheadline": "Monthly books.",
            "primaryCtaLabel": "Book a call"
        }));
        let intake = IntakeContract::default();
        let voice = VoiceContract::default();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };

        let found = check(&view);
        let severities: Vec<Severity> = found.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::Medium, Severity::High, Severity::Low]);
        assert!(found[0].issue.contains("home/features"));
        assert!(found[1].issue.contains("ctaPrimary"));
    }
}
