//! Candidate recommendations derived from the current site.
//!
//! Each candidate carries its raw scoring inputs; ranking and eligibility
//! happen in [`super::engine`].

use uuid::Uuid;

use sitepilot_types::contract::{BlogPresence, VisualGravity};
use sitepilot_types::draft::{PresentationTool, StructureTool, ToolCall};
use sitepilot_types::recommendation::{Phase, RecommendationKind};
use sitepilot_types::site::{PageKind, SectionType};

use crate::contract::design::theme_for;
use crate::validate::catalog::variants;
use crate::view::{SiteView, hero, late_proof, proof_first_order};

/// Headlines longer than this are worth tightening.
pub const LONG_HEADLINE: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub kind: RecommendationKind,
    pub key: String,
    pub title: String,
    pub rationale: String,
    pub impact: f64,
    pub alignment: f64,
    pub confidence: f64,
    pub disruption: f64,
    /// Works against the user's stated plans; alignment is capped.
    pub misaligned: bool,
    pub action: Option<ToolCall>,
    pub focus_section: Option<Uuid>,
}

impl Candidate {
    fn new(kind: RecommendationKind, target: &str, title: String, rationale: &str) -> Self {
        Self {
            kind,
            key: format!("{kind}:{target}"),
            title,
            rationale: rationale.to_string(),
            impact: 0.0,
            alignment: 0.0,
            confidence: 0.0,
            disruption: 0.0,
            misaligned: false,
            action: None,
            focus_section: None,
        }
    }

    fn scored(mut self, impact: f64, alignment: f64, confidence: f64, disruption: f64) -> Self {
        self.impact = impact;
        self.alignment = alignment;
        self.confidence = confidence;
        self.disruption = disruption;
        self
    }

    fn action(mut self, call: impl Into<ToolCall>) -> Self {
        self.action = Some(call.into());
        self
    }

    fn focus(mut self, section: Uuid) -> Self {
        self.focus_section = Some(section);
        self
    }

    pub fn phase(&self) -> Phase {
        match (&self.action, self.focus_section) {
            (Some(call), _) => call.phase(),
            (None, Some(_)) => Phase::Content,
            (None, None) => Phase::None,
        }
    }
}

/// Every candidate that applies to the site right now, in a stable order.
pub fn candidates(view: &SiteView<'_>) -> Vec<Candidate> {
    let mut out = Vec::new();

    if let Some(home) = view.home() {
        if !home.has_section(SectionType::CtaPrimary) {
            out.push(
                Candidate::new(
                    RecommendationKind::AddPrimaryCta,
                    "home",
                    "Add a primary call to action to the home page".to_string(),
                    "Visitors who are ready to act have no clear next step on the home page.",
                )
                .scored(5.0, 5.0, 5.0, 1.0)
                .action(StructureTool::AddSection {
                    page: PageKind::Home,
                    section_type: SectionType::CtaPrimary,
                    position: None,
                }),
            );
        }

        if !home.sections.iter().any(|s| s.section_type.is_proof()) {
            out.push(
                Candidate::new(
                    RecommendationKind::AddProofSection,
                    "home",
                    "Add testimonials to the home page".to_string(),
                    "Nothing on the home page shows that others trust you.",
                )
                .scored(4.0, 4.0, 4.0, 2.0)
                .action(StructureTool::AddSection {
                    page: PageKind::Home,
                    section_type: SectionType::Testimonials,
                    position: None,
                }),
            );
        }

        if !home.has_section(SectionType::Faq) && !view.data.has_page(PageKind::Faq) {
            out.push(
                Candidate::new(
                    RecommendationKind::AddFaqSection,
                    "home",
                    "Answer common questions on the home page".to_string(),
                    "A short FAQ removes doubts before they become reasons to leave.",
                )
                .scored(3.5, 3.0, 4.0, 1.0)
                .action(StructureTool::AddSection {
                    page: PageKind::Home,
                    section_type: SectionType::Faq,
                    position: None,
                }),
            );
        }
    }

    for page in &view.data.pages {
        if !late_proof(page).is_empty() {
            out.push(
                Candidate::new(
                    RecommendationKind::MoveProofBeforeCta,
                    page.kind.key(),
                    format!("Move proof ahead of the call to action on the {} page", page.kind),
                    "Proof is most persuasive just before the visitor is asked to act.",
                )
                .scored(3.5, 4.0, 4.0, 1.0)
                .action(StructureTool::ReorderSections {
                    page: page.kind,
                    order: proof_first_order(page),
                }),
            );
        }
    }

    if !view.data.has_page(PageKind::Blog) {
        match view.intake.blog_presence {
            Some(BlogPresence::Yes) | Some(BlogPresence::Later) => {
                let mut c = Candidate::new(
                    RecommendationKind::EnableBlog,
                    "blog",
                    "Enable the blog".to_string(),
                    "You said you want to publish articles.",
                )
                .scored(3.0, 4.0, 4.0, 2.0)
                .action(StructureTool::EnableBlog);
                c.misaligned = view.intake.blog_presence == Some(BlogPresence::Later);
                out.push(c);
            }
            Some(BlogPresence::No) | None => {}
        }
    }

    if !view.has_contact_path() {
        out.push(
            Candidate::new(
                RecommendationKind::AddContactPage,
                "contact",
                "Add a contact page".to_string(),
                "There is no way for a visitor to reach you.",
            )
            .scored(4.0, 4.0, 4.0, 2.0)
            .action(StructureTool::AddPage {
                page: PageKind::Contact,
                goal: "Make it easy to get in touch".to_string(),
                sections: vec![SectionType::HeroMinimal, SectionType::Contact],
            }),
        );
    }

    if let Some((page, section)) = view.sections().find(|(_, s)| s.content.is_none()) {
        out.push(
            Candidate::new(
                RecommendationKind::FillEmptySection,
                &section.id.to_string(),
                format!("Write copy for the {} section on the {page} page", section.section_type),
                "Empty sections read as unfinished.",
            )
            .scored(4.0, 4.0, 4.0, 1.0)
            .focus(section.id),
        );
    }

    if let Some(home_hero) = view.home().and_then(hero) {
        let long_headline = home_hero
            .content
            .as_ref()
            .and_then(|c| c.get("headline"))
            .and_then(|h| h.as_str())
            .is_some_and(|h| h.chars().count() > LONG_HEADLINE);
        if long_headline {
            out.push(
                Candidate::new(
                    RecommendationKind::TightenHeroCopy,
                    &home_hero.id.to_string(),
                    "Tighten the home page headline".to_string(),
                    "The headline is long enough that visitors skim past it.",
                )
                .scored(3.5, 4.0, 3.0, 1.0)
                .focus(home_hero.id),
            );
        }

        if let Some(intent) = view.intent {
            let options = variants(home_hero.section_type);
            let preferred = match intent.visual_gravity {
                VisualGravity::Expressive => options.get(1).unwrap_or(&options[0]),
                VisualGravity::Minimal | VisualGravity::Balanced => &options[0],
            };
            if home_hero.variant != *preferred {
                out.push(
                    Candidate::new(
                        RecommendationKind::SwitchHeroVariant,
                        &format!("{}:{preferred}", home_hero.id),
                        format!("Switch the home hero to the {preferred} layout"),
                        "That layout matches the feel you chose.",
                    )
                    .scored(3.0, 4.5, 3.5, 1.0)
                    .action(PresentationTool::SwitchSectionVariant {
                        section_id: home_hero.id,
                        variant: preferred.to_string(),
                    }),
                );
            }
        }
    }

    if let Some(intent) = view.intent {
        let theme = theme_for(intent);
        if view.data.theme != theme && !view.data.pages.is_empty() {
            out.push(
                Candidate::new(
                    RecommendationKind::ApplyIntentTheme,
                    theme.key(),
                    format!("Switch to the {theme} theme"),
                    "The current theme drifts from the feel you locked in.",
                )
                .scored(3.0, 5.0, 4.0, 3.0)
                .action(PresentationTool::ApplyTheme { theme }),
            );
        }
    }

    out
}
