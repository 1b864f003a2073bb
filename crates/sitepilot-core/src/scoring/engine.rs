//! Weighted scoring, history-based eligibility and ranking.

use std::collections::HashMap;

use uuid::Uuid;

use sitepilot_types::config::RecommendationConfig;
use sitepilot_types::recommendation::{
    KeyHistory, Phase, Recommendation, RecommendationKind, RecommendationRecord,
    RecommendationStatus, Scores,
};

use super::candidates::{Candidate, candidates};
use crate::view::{SiteView, hero};

/// Alignment ceiling for candidates that work against the stated plans.
pub const MISALIGNED_ALIGNMENT_CAP: f64 = 2.0;

/// `0.4·impact + 0.3·alignment + 0.2·confidence − 0.1·disruption`, rounded
/// to two decimals so threshold comparisons are exact.
pub fn weighted_score(impact: f64, alignment: f64, confidence: f64, disruption: f64) -> f64 {
    let raw = 0.4 * impact + 0.3 * alignment + 0.2 * confidence - 0.1 * disruption;
    (raw * 100.0).round() / 100.0
}

pub fn score(candidate: &Candidate) -> Scores {
    let alignment = if candidate.misaligned {
        candidate.alignment.min(MISALIGNED_ALIGNMENT_CAP)
    } else {
        candidate.alignment
    };
    Scores {
        impact: candidate.impact,
        alignment,
        confidence: candidate.confidence,
        disruption: candidate.disruption,
        score: weighted_score(candidate.impact, alignment, candidate.confidence, candidate.disruption),
    }
}

/// Outcome counts per dedup key. `proposed` counts records still awaiting a
/// decision.
pub fn key_history(records: &[RecommendationRecord]) -> HashMap<String, KeyHistory> {
    let mut history: HashMap<String, KeyHistory> = HashMap::new();
    for record in records {
        let entry = history.entry(record.recommendation.key.clone()).or_default();
        match record.status {
            RecommendationStatus::Proposed => entry.proposed += 1,
            RecommendationStatus::Accepted => entry.accepted += 1,
            RecommendationStatus::Rejected => entry.rejected += 1,
            RecommendationStatus::Deferred => entry.deferred += 1,
        }
    }
    history
}

/// Ranks candidate recommendations for a site.
#[derive(Debug, Clone)]
pub struct RecommendationEngine {
    config: RecommendationConfig,
}

impl RecommendationEngine {
    pub fn new(config: RecommendationConfig) -> Self {
        Self { config }
    }

    /// Whether a key may be proposed again given its history.
    pub fn is_eligible(&self, history: Option<&KeyHistory>) -> bool {
        match history {
            None => true,
            Some(h) => {
                h.accepted == 0
                    && h.rejected == 0
                    && h.proposed == 0
                    && h.deferred < self.config.max_deferrals
            }
        }
    }

    /// Ranked recommendations for the site, always ending with "leave as is".
    ///
    /// 1. Collect candidates from the site view
    /// 2. Drop keys already decided, pending, or deferred too often
    /// 3. Score, keep those at or above the threshold, sort descending
    /// 4. Truncate to the audience cap and cite up to two alternatives each
    pub fn recommend(
        &self,
        view: &SiteView<'_>,
        history: &HashMap<String, KeyHistory>,
    ) -> Vec<Recommendation> {
        let mut eligible: Vec<(Candidate, Scores)> = candidates(view)
            .into_iter()
            .filter(|c| self.is_eligible(history.get(&c.key)))
            .map(|c| {
                let scores = score(&c);
                (c, scores)
            })
            .filter(|(_, s)| s.score >= self.config.score_threshold)
            .collect();

        eligible.sort_by(|a, b| b.1.score.total_cmp(&a.1.score));

        let titles: Vec<String> = eligible.iter().map(|(c, _)| c.title.clone()).collect();
        let cap = self.config.cap_for(view.voice.audience_level);

        let mut out: Vec<Recommendation> = eligible
            .into_iter()
            .take(cap)
            .map(|(c, scores)| {
                let why_not = titles
                    .iter()
                    .filter(|t| **t != c.title)
                    .take(2)
                    .cloned()
                    .collect();
                Recommendation {
                    id: Uuid::now_v7(),
                    recommendation_id: c.kind,
                    phase: c.phase(),
                    key: c.key,
                    title: c.title,
                    rationale: c.rationale,
                    why_not,
                    scores,
                    action: c.action,
                    focus_section: c.focus_section,
                }
            })
            .collect();

        out.push(leave_as_is(view));
        out
    }
}

/// The non-actionable option naming the strongest existing element.
pub fn leave_as_is(view: &SiteView<'_>) -> Recommendation {
    let home = view.home();
    let strongest = home
        .and_then(|p| p.sections.iter().find(|s| s.section_type.is_proof()))
        .map(|s| format!("the {} section", s.section_type))
        .or_else(|| home.and_then(hero).map(|_| "the home hero".to_string()))
        .or_else(|| view.data.pages.first().map(|p| format!("the {} page", p.kind)))
        .unwrap_or_else(|| "the site".to_string());

    Recommendation {
        id: Uuid::now_v7(),
        recommendation_id: RecommendationKind::LeaveAsIs,
        key: RecommendationKind::LeaveAsIs.key().to_string(),
        phase: Phase::None,
        title: format!("Leave {strongest} as is"),
        rationale: "It already does its job; changing it now adds risk without a clear gain."
            .to_string(),
        why_not: Vec::new(),
        scores: Scores::default(),
        action: None,
        focus_section: None,
    }
}
