use sitepilot_types::audit::{AuditArea, AuditFinding, Severity};
use sitepilot_types::site::SectionType;

use super::{WithRecommendation, finding};
use crate::view::{SiteView, late_proof};

pub fn check(view: &SiteView<'_>) -> Vec<AuditFinding> {
    let mut out = Vec::new();
    if view.data.pages.is_empty() {
        return out;
    }

    if let Some(home) = view.home() {
        if !home.has_section(SectionType::CtaPrimary) {
            out.push(
                finding(
                    Severity::High,
                    AuditArea::Conversion,
                    "The home page has no primary call to action.",
                    "Visitors who are ready to act have nowhere obvious to go.",
                )
                .suggest("Add a ctaPrimary section at the end of the home page."),
            );
        }
    }

    if !view.has_contact_path() {
        out.push(
            finding(
                Severity::Medium,
                AuditArea::Conversion,
                "There is no way to contact you.",
                "A site without a contact path loses every visitor with a question.",
            )
            .suggest("Add a contact page or a contact section."),
        );
    }

    for page in &view.data.pages {
        let late = late_proof(page);
        if !late.is_empty() {
            let names: Vec<&str> = late.iter().map(|t| t.key()).collect();
            out.push(
                finding(
                    Severity::Medium,
                    AuditArea::Conversion,
                    format!(
                        "On the {} page, {} comes after the call to action.",
                        page.kind,
                        names.join(", ")
                    ),
                    "Proof persuades best just before the visitor is asked to act.",
                )
                .suggest("Move proof sections ahead of the call to action."),
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_types::contract::{IntakeContract, VoiceContract};
    use sitepilot_types::site::{PageKind, SiteData, ThemePreset};

    use crate::audit::fixtures::page;

    #[test]
    fn test_missing_cta_contact_and_late_proof() {
        let mut data = SiteData::empty(ThemePreset::Classic);
        data.pages.push(page(
            PageKind::Home,
            &[SectionType::HeroSplit, SectionType::Features, SectionType::Stats],
        ));
        data.pages.push(page(
            PageKind::Services,
            &[
                SectionType::HeroMinimal,
                SectionType::Services,
                SectionType::CtaPrimary,
            ],
        ));
        data.normalize();
        let intake = IntakeContract::default();
        let voice = VoiceContract::default();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let found = check(&view);
        let severities: Vec<Severity> = found.iter().map(|f| f.severity).collect();
        assert_eq!(severities, vec![Severity::High, Severity::Medium]);

        data.pages[1].sections.push(crate::tools::structure::new_section(SectionType::Testimonials));
        data.normalize();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let found = check(&view);
        assert_eq!(found.len(), 3);
        assert!(found[2].issue.contains("services page, testimonials"));
    }

    #[test]
    fn test_empty_site_has_no_conversion_findings() {
        let data = SiteData::empty(ThemePreset::Classic);
        let intake = IntakeContract::default();
        let voice = VoiceContract::default();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        assert!(check(&view).is_empty());
    }
}
