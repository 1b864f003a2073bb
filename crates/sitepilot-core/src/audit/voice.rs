use sitepilot_types::audit::{AuditArea, AuditFinding, Severity};
use sitepilot_types::contract::{Verbosity, VoiceTone};

use super::{WithRecommendation, finding, text_leaves};
use crate::view::SiteView;

/// Longest single text a concise voice should carry.
pub const CONCISE_LEAF_MAX: usize = 300;

pub fn check(view: &SiteView<'_>) -> Vec<AuditFinding> {
    let mut out = Vec::new();
    let voice = view.voice;

    if !voice.is_complete() {
        let missing: Vec<&str> = voice.missing_fields().iter().map(|f| f.key()).collect();
        out.push(
            finding(
                Severity::Low,
                AuditArea::Voice,
                format!("The voice contract is incomplete (missing: {}).", missing.join(", ")),
                "Without a voice, copy drifts between sections.",
            )
            .suggest("Answer the voice questions before drafting more copy."),
        );
    }

    let written: Vec<_> = view
        .sections()
        .filter_map(|(page, s)| s.content.as_ref().map(|c| (page, s.section_type, c)))
        .collect();

    if voice.verbosity == Some(Verbosity::Concise) {
        for (page, section_type, content) in &written {
            if text_leaves(content).iter().any(|t| t.chars().count() > CONCISE_LEAF_MAX) {
                out.push(finding(
                    Severity::Low,
                    AuditArea::Voice,
                    format!("The {section_type} section on the {page} page runs long for a concise voice."),
                    format!("Concise copy keeps each block under {CONCISE_LEAF_MAX} characters."),
                ));
            }
        }
    }

    if voice.tone == Some(VoiceTone::Plain) {
        for (page, section_type, content) in &written {
            if text_leaves(content).iter().any(|t| t.contains('!')) {
                out.push(finding(
                    Severity::Low,
                    AuditArea::Voice,
                    format!("The {section_type} section on the {page} page uses exclamation marks."),
                    "A plain tone states things without raising its voice.",
                ));
            }
        }
    }

    out
}
