use sitepilot_types::audit::{AuditArea, AuditFinding, Severity};
use sitepilot_types::contract::BlogPresence;
use sitepilot_types::site::{PageKind, SectionType};

use super::{WithRecommendation, finding};
use crate::view::SiteView;

pub fn check(view: &SiteView<'_>) -> Vec<AuditFinding> {
    let mut out = Vec::new();
    let has_blog = view.data.has_page(PageKind::Blog);

    match view.intake.blog_presence {
        Some(BlogPresence::No) if has_blog => out.push(
            finding(
                Severity::High,
                AuditArea::Coherence,
                "The site has a blog page, but you said you do not want a blog.",
                "An empty or abandoned blog signals neglect.",
            )
            .suggest("Remove the blog page or update your intake answer."),
        ),
        Some(BlogPresence::Yes) if !has_blog => out.push(
            finding(
                Severity::Low,
                AuditArea::Coherence,
                "You asked for a blog, but the site has none yet.",
                "The plan and the site have drifted apart.",
            )
            .suggest("Enable the blog."),
        ),
        _ => {}
    }

    for page in &view.data.pages {
        if page.goal.trim().is_empty() {
            out.push(finding(
                Severity::Low,
                AuditArea::Coherence,
                format!("The {} page has no stated goal.", page.kind),
                "Without a goal there is no way to judge whether the page works.",
            ));
        }
    }

    if let Some(services) = view.data.page(PageKind::Services) {
        if !services.has_section(SectionType::Services) {
            out.push(
                finding(
                    Severity::Low,
                    AuditArea::Coherence,
                    "The services page does not list any services.",
                    "Visitors open that page to see what you offer.",
                )
                .suggest("Add a services section."),
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_types::contract::{IntakeContract, VoiceContract};

    use crate::audit::fixtures::{healthy, page};

    #[test]
    fn test_blog_contradiction() {
        let mut data = healthy();
        data.pages.push(page(PageKind::Blog, &[SectionType::HeroMinimal, SectionType::BlogFeed]));
        let intake = IntakeContract {
            blog_presence: Some(BlogPresence::No),
            ..Default::default()
        };
        let voice = VoiceContract::default();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let found = check(&view);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::High);
    }

    #[test]
    fn test_goal_and_services_rules() {
        let mut data = healthy();
        data.pages[0].goal = "  ".to_string();
        data.pages.push(page(PageKind::Services, &[SectionType::HeroMinimal, SectionType::Pricing]));
        let intake = IntakeContract {
            blog_presence: Some(BlogPresence::Yes),
            ..Default::default()
        };
        let voice = VoiceContract::default();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let found = check(&view);
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|f| f.severity == Severity::Low));
    }
}
