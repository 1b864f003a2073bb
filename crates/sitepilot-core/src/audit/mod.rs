//! Deterministic site audits.
//!
//! Six independent rule sets each inspect the whole site (plus the intake and
//! voice contracts) and return severity-tagged findings. Rule sets never see
//! each other's output, so their order does not matter.

mod coherence;
mod content;
mod conversion;
mod presentation;
mod structure;
mod voice;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use sitepilot_types::audit::{AuditArea, AuditFinding, AuditRun, Severity};
use sitepilot_types::site::SiteId;

use crate::view::SiteView;

type RuleSet = fn(&SiteView<'_>) -> Vec<AuditFinding>;

const RULE_SETS: [(AuditArea, RuleSet); 6] = [
    (AuditArea::Structure, structure::check),
    (AuditArea::Content, content::check),
    (AuditArea::Voice, voice::check),
    (AuditArea::Presentation, presentation::check),
    (AuditArea::Conversion, conversion::check),
    (AuditArea::Coherence, coherence::check),
];

/// Run every rule set and collect the findings into a new run record.
pub fn run_audit(site_id: SiteId, view: &SiteView<'_>) -> AuditRun {
    let findings: Vec<AuditFinding> = RULE_SETS
        .iter()
        .flat_map(|(area, rules)| {
            let found = rules(view);
            tracing::debug!(area = %area, count = found.len(), "audit rule set finished");
            found
        })
        .collect();

    AuditRun {
        id: Uuid::now_v7(),
        site_id,
        findings,
        created_at: Utc::now(),
    }
}

/// Human-readable report, grouped by severity with the highest first.
pub fn format_report(run: &AuditRun) -> String {
    if run.findings.is_empty() {
        return "Audit complete: no issues found.".to_string();
    }
    let mut out = format!("Audit complete: {} finding(s).", run.findings.len());
    for (severity, group) in run.by_severity() {
        out.push_str(&format!("\n\n{} severity:", capitalize(severity.key())));
        for f in group {
            out.push_str(&format!("\n- [{}] {} {}", f.area, f.issue, f.rationale));
            if let Some(rec) = &f.recommendation {
                out.push_str(&format!(" Suggested: {rec}"));
            }
        }
    }
    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn finding(
    severity: Severity,
    area: AuditArea,
    issue: impl Into<String>,
    rationale: impl Into<String>,
) -> AuditFinding {
    AuditFinding {
        severity,
        area,
        issue: issue.into(),
        rationale: rationale.into(),
        recommendation: None,
    }
}

pub(crate) trait WithRecommendation {
    fn suggest(self, recommendation: impl Into<String>) -> Self;
}

impl WithRecommendation for AuditFinding {
    fn suggest(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

/// Every string leaf of a content object.
pub(crate) fn text_leaves(value: &Value) -> Vec<&str> {
    let mut out = Vec::new();
    collect_leaves(value, &mut out);
    out
}

fn collect_leaves<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_leaves(v, out)),
        _ => {}
    }
}

/// Headline of a hero section, if it has copy.
pub(crate) fn headline(content: Option<&Value>) -> Option<&str> {
    content?.get("headline")?.as_str()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::json;
    use sitepilot_types::site::{Page, PageKind, SectionType, SiteData, ThemePreset};

    use crate::tools::structure::new_section;

    pub fn page(kind: PageKind, types: &[SectionType]) -> Page {
        let mut page = Page {
            kind,
            goal: "help visitors decide".to_string(),
            position: 0,
            sections: types.iter().copied().map(new_section).collect(),
        };
        page.renumber();
        page
    }

    /// A small, healthy site: no findings under a complete voice.
    pub fn healthy() -> SiteData {
        let mut data = SiteData::empty(ThemePreset::Classic);
        data.pages.push(page(
            PageKind::Home,
            &[
                SectionType::HeroSplit,
                SectionType::Features,
                SectionType::Testimonials,
                SectionType::Contact,
                SectionType::CtaPrimary,
            ],
        ));
        let home = &mut data.pages[0];
        home.sections[0].content = Some(json!({
            "headline": "Bookkeeping for small studios",
            "subheadline": "Monthly books, tax prep and plain answers.",
            "primaryCtaLabel": "Book a call"
        }));
        home.sections[1].content = Some(json!({
            "heading": "What you get",
            "items": [
                {"title": "Monthly books", "body": "Reconciled by the fifth."},
                {"title": "Tax prep", "body": "Filed on time, every quarter."},
                {"title": "Answers", "body": "A person replies within a day."}
            ]
        }));
        home.sections[2].content = Some(json!({
            "heading": "Clients",
            "quotes": [{"quote": "Our books finally make sense.", "attribution": "Dana, studio owner"}]
        }));
        home.sections[3].content = Some(json!({
            "heading": "Get in touch",
            "body": "Tell us about your studio.",
            "ctaLabel": "Send"
        }));
        home.sections[4].content = Some(json!({
            "heading": "Ready when you are",
            "body": "Start with a short call.",
            "buttonLabel": "Book a call"
        }));
        data.normalize();
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_types::contract::{
        Assertiveness, AudienceLevel, BlogPresence, IntakeContract, Verbosity, VoiceContract,
        VoiceTone,
    };
    use sitepilot_types::site::{SectionType, SiteData, ThemePreset};

    fn complete_voice() -> VoiceContract {
        VoiceContract {
            audience_level: Some(AudienceLevel::General),
            tone: Some(VoiceTone::Warm),
            assertiveness: Some(Assertiveness::Balanced),
            verbosity: Some(Verbosity::Standard),
        }
    }

    fn intake() -> IntakeContract {
        IntakeContract {
            purpose: Some("bookkeeping".to_string()),
            audience: Some("studios".to_string()),
            action: Some("book a call".to_string()),
            tone: Some("friendly".to_string()),
            blog_presence: Some(BlogPresence::No),
        }
    }

    #[test]
    fn test_healthy_site_has_no_findings() {
        let data = fixtures::healthy();
        let intake = intake();
        let voice = complete_voice();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let run = run_audit(SiteId::new(), &view);
        assert!(run.findings.is_empty(), "{:?}", run.findings);
        assert_eq!(format_report(&run), "Audit complete: no issues found.");
    }

    #[test]
    fn test_each_run_is_a_new_record() {
        let data = fixtures::healthy();
        let intake = intake();
        let voice = complete_voice();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let site_id = SiteId::new();
        let a = run_audit(site_id, &view);
        let b = run_audit(site_id, &view);
        assert_ne!(a.id, b.id);
        assert_eq!(a.findings, b.findings);
    }

    #[test]
    fn test_report_groups_highest_first() {
        let mut data = fixtures::healthy();
        data.pages[0].sections.retain(|s| s.section_type != SectionType::CtaPrimary);
        data.normalize();
        let intake = intake();
        let voice = VoiceContract::default();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let run = run_audit(SiteId::new(), &view);
        let report = format_report(&run);
        let high = report.find("High severity:").unwrap();
        let low = report.find("Low severity:").unwrap();
        assert!(high < low);
        assert!(report.contains("[conversion]"));
        assert!(report.contains("[voice]"));
    }

    #[test]
    fn test_empty_site() {
        let data = SiteData::empty(ThemePreset::Classic);
        let intake = intake();
        let voice = complete_voice();
        let view = SiteView { data: &data, intake: &intake, voice: &voice, intent: None };
        let run = run_audit(SiteId::new(), &view);
        assert!(run.findings.iter().any(|f| f.severity == Severity::High && f.area == AuditArea::Structure));
    }

    #[test]
    fn test_text_leaves() {
        let v = serde_json::json!({"a": "x", "b": [{"c": "y"}, 3], "d": null});
        let mut leaves = text_leaves(&v);
        leaves.sort();
        assert_eq!(leaves, vec!["x", "y"]);
    }
}
