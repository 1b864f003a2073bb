use sitepilot_types::audit::{AuditArea, AuditFinding, Severity};

use super::{WithRecommendation, finding};
use crate::contract::design::theme_for;
use crate::validate::catalog::{is_valid_variant, variants};
use crate::view::{SiteView, hero};

/// Identical heroes on this many pages make the site feel templated.
pub const REPEATED_HERO_PAGES: usize = 3;

pub fn check(view: &SiteView<'_>) -> Vec<AuditFinding> {
    let mut out = Vec::new();

    if let Some(intent) = view.intent {
        let expected = theme_for(intent);
        if view.data.theme != expected {
            out.push(
                finding(
                    Severity::Medium,
                    AuditArea::Presentation,
                    format!("The site uses the {} theme.", view.data.theme),
                    "The locked design intent calls for a different visual system.",
                )
                .suggest(format!("Switch to the {expected} theme.")),
            );
        }
    }

    for (page, section) in view.sections() {
        if !is_valid_variant(section.section_type, &section.variant) {
            out.push(
                finding(
                    Severity::High,
                    AuditArea::Presentation,
                    format!(
                        "The {} section on the {page} page uses unknown variant '{}'.",
                        section.section_type, section.variant
                    ),
                    "Unknown variants fall back to an unstyled layout.",
                )
                .suggest(format!(
                    "Use one of: {}.",
                    variants(section.section_type).join(", ")
                )),
            );
        }
    }

    let heroes: Vec<_> = view.data.pages.iter().filter_map(hero).collect();
    if heroes.len() >= REPEATED_HERO_PAGES {
        let first = heroes[0];
        let same = heroes
            .iter()
            .all(|h| h.section_type == first.section_type && h.variant == first.variant);
        if same {
            out.push(finding(
                Severity::Low,
                AuditArea::Presentation,
                format!("Every page opens with the same {} hero.", first.section_type),
                "Varying the hero helps visitors notice they changed pages.",
            ));
        }
    }

    out
}
