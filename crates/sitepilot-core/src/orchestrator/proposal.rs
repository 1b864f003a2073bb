//! Deterministic proposal steps: resolving what a request refers to and
//! turning it into a tool call, plus the text shown when something is staged.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use sitepilot_types::contract::{DesignIntent, IntakeContract};
use sitepilot_types::draft::{PresentationTool, ReleaseTool};
use sitepilot_types::plan::SitePlan;
use sitepilot_types::recommendation::Recommendation;
use sitepilot_types::site::{PageKind, Section, SectionType, SiteData, ThemePreset};

use crate::contract::design::theme_for;
use crate::validate::catalog::variants;

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b")
        .expect("valid uuid regex")
});
static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]{1,80})""#).expect("valid quoted label regex"));
static ROLLBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(roll ?back|revert|restore)\b").expect("valid rollback regex"));
static PUBLISH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(publish|go live|launch)\b").expect("valid publish regex"));
static PREVIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpreview\b").expect("valid preview regex"));

/// Whether `needle` occurs in `haystack` on word boundaries. Both sides are
/// expected lowercase.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn section_aliases(section_type: SectionType) -> &'static [&'static str] {
    match section_type {
        SectionType::HeroSplit | SectionType::HeroCentered | SectionType::HeroMinimal => {
            &["hero", "headline"]
        }
        SectionType::Features => &["features"],
        SectionType::Services => &["services"],
        SectionType::Process => &["process", "steps"],
        SectionType::Testimonials => &["testimonials", "testimonial", "reviews", "quotes"],
        SectionType::Logos => &["logos"],
        SectionType::Stats => &["stats", "numbers"],
        SectionType::About => &["about"],
        SectionType::Team => &["team"],
        SectionType::Gallery => &["gallery"],
        SectionType::Pricing => &["pricing", "prices"],
        SectionType::Faq => &["faq", "questions"],
        SectionType::Contact => &["contact"],
        SectionType::CtaPrimary => &["call to action", "cta"],
        SectionType::BlogFeed => &["blog feed"],
        SectionType::BlogFeatured => &["featured post"],
    }
}

fn mentioned_page(text: &str) -> Option<PageKind> {
    PageKind::ALL
        .iter()
        .copied()
        .find(|k| contains_word(text, &format!("{} page", k.key())))
}

fn mentions_section(text: &str, section_type: SectionType) -> bool {
    section_aliases(section_type).iter().any(|a| contains_word(text, a))
}

/// The section a content request refers to.
///
/// `scope` may be a section id or a page id. Otherwise the message is
/// searched for a page ("about page") and a section name. With no usable
/// mention, the first section without copy is chosen, then the home hero.
pub fn content_target<'a>(
    data: &'a SiteData,
    scope: Option<&str>,
    message: &str,
) -> Option<(PageKind, &'a Section)> {
    if let Some(id) = scope.and_then(|s| Uuid::parse_str(s.trim()).ok()) {
        return data.find_section(id);
    }

    let text = message.to_lowercase();
    let page = scope
        .and_then(|s| s.trim().parse::<PageKind>().ok())
        .or_else(|| mentioned_page(&text));

    let pages: Vec<_> = match page {
        Some(kind) => data.page(kind).into_iter().collect(),
        None => {
            // Home first, then the rest in canonical order.
            let mut pages: Vec<_> = data.pages.iter().collect();
            pages.sort_by_key(|p| p.kind != PageKind::Home);
            pages
        }
    };

    let by_mention = pages.iter().find_map(|p| {
        p.sections
            .iter()
            .find(|s| mentions_section(&text, s.section_type))
            .map(|s| (p.kind, s))
    });
    if by_mention.is_some() {
        return by_mention;
    }

    pages
        .iter()
        .find_map(|p| p.sections.iter().find(|s| s.content.is_none()).map(|s| (p.kind, s)))
        .or_else(|| {
            pages
                .iter()
                .find_map(|p| p.sections.first().map(|s| (p.kind, s)))
        })
}

/// A presentation tool call for a request, if one can be derived.
///
/// A named theme wins; then a named variant of some section; then a bare
/// mention of "theme" falls back to the theme the design intent implies.
pub fn presentation_proposal(
    data: &SiteData,
    intent: Option<&DesignIntent>,
    scope: Option<&str>,
    message: &str,
) -> Option<PresentationTool> {
    let text = message.to_lowercase();

    if let Some(theme) = ThemePreset::ALL.iter().find(|t| contains_word(&text, t.key())) {
        return Some(PresentationTool::ApplyTheme { theme: *theme });
    }

    let scoped = scope.and_then(|s| Uuid::parse_str(s.trim()).ok());
    let mut sections: Vec<&Section> = data.pages.iter().flat_map(|p| p.sections.iter()).collect();
    sections.sort_by_key(|s| Some(s.id) != scoped);
    for section in sections {
        let named = variants(section.section_type)
            .iter()
            .find(|v| **v != section.variant && contains_word(&text, &v.to_lowercase()));
        let Some(variant) = named else {
            continue;
        };
        let type_named = mentions_section(&text, section.section_type) || Some(section.id) == scoped;
        if type_named {
            return Some(PresentationTool::SwitchSectionVariant {
                section_id: section.id,
                variant: variant.to_string(),
            });
        }
    }

    if contains_word(&text, "theme") {
        return intent.map(|i| PresentationTool::ApplyTheme { theme: theme_for(i) });
    }
    None
}

/// What a release request asks for, before snapshots are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseRequest {
    Preview { label: Option<String> },
    Publish { snapshot_id: Option<Uuid> },
    Rollback { snapshot_id: Option<Uuid> },
}

/// Keywords inside a quoted label never select the operation.
pub fn parse_release(message: &str) -> Option<ReleaseRequest> {
    let snapshot_id = UUID_RE
        .find(message)
        .and_then(|m| Uuid::parse_str(m.as_str()).ok());
    let unquoted = QUOTED_RE.replace_all(message, " ");
    if ROLLBACK_RE.is_match(&unquoted) {
        Some(ReleaseRequest::Rollback { snapshot_id })
    } else if PUBLISH_RE.is_match(&unquoted) {
        Some(ReleaseRequest::Publish { snapshot_id })
    } else if PREVIEW_RE.is_match(&unquoted) {
        let label = QUOTED_RE
            .captures(message)
            .map(|c| c[1].trim().to_string())
            .filter(|l| !l.is_empty());
        Some(ReleaseRequest::Preview { label })
    } else {
        None
    }
}

/// Human summary of a staged release tool.
pub fn describe_release(tool: &ReleaseTool) -> String {
    match tool {
        ReleaseTool::CreatePreview { label } => format!("create a preview labelled \"{label}\""),
        ReleaseTool::PublishSnapshot { snapshot_id } => format!("publish preview {snapshot_id}"),
        ReleaseTool::RollbackToSnapshot { snapshot_id } => {
            format!("roll the live site back to snapshot {snapshot_id}")
        }
    }
}

pub fn describe_presentation(tool: &PresentationTool, data: &SiteData) -> String {
    match tool {
        PresentationTool::ApplyTheme { theme } => {
            format!("switch the theme from {} to {theme}", data.theme)
        }
        PresentationTool::SwitchSectionVariant { section_id, variant } => {
            match data.find_section(*section_id) {
                Some((page, s)) => format!(
                    "switch the {} section on the {page} page from the {} layout to {variant}",
                    s.section_type, s.variant
                ),
                None => format!("switch section {section_id} to the {variant} layout"),
            }
        }
    }
}

/// Plan listing shown when a plan is proposed.
pub fn render_plan(plan: &SitePlan, rationale: &str) -> String {
    let mut out = format!(
        "Here is the plan ({} pages, {} sections):",
        plan.page_count(),
        plan.section_count()
    );
    for (kind, page) in &plan.pages {
        let sections: Vec<&str> = page.ordered_sections.iter().map(|s| s.key()).collect();
        out.push_str(&format!("\n- {kind}: {} (goal: {})", sections.join(", "), page.goal));
    }
    if !rationale.trim().is_empty() {
        out.push_str(&format!("\n\n{}", rationale.trim()));
    }
    out.push_str("\n\nShall I build it? (yes / no)");
    out
}

/// Numbered recommendation list shown when a recommendation draft is staged.
pub fn render_recommendations(recommendations: &[Recommendation]) -> String {
    let mut out = String::from("Here is what I would do next:");
    for (i, rec) in recommendations.iter().enumerate() {
        if rec.is_actionable() {
            out.push_str(&format!(
                "\n{}. {} (score {:.2}). {}",
                i + 1,
                rec.title,
                rec.scores.score,
                rec.rationale
            ));
            if !rec.why_not.is_empty() {
                out.push_str(&format!(" Ranked above: {}.", rec.why_not.join("; ")));
            }
        } else {
            out.push_str(&format!("\n{}. {}", i + 1, rec.title));
        }
    }
    out.push_str("\n\nReply with a number to choose.");
    out
}

/// Site name derived from the intake purpose.
pub fn site_name(intake: &IntakeContract) -> String {
    let purpose = intake.purpose.as_deref().unwrap_or("My site").trim();
    let name: String = purpose.chars().take(40).collect();
    if name.is_empty() { "My site".to_string() } else { name }
}
