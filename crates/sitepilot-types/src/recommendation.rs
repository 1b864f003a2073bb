use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::draft::ToolCall;
use crate::site::SiteId;

keyed_enum! {
    /// The fixed recommendation kinds plus the non-actionable "leave as is".
    pub enum RecommendationKind {
        AddProofSection => "addProofSection",
        AddPrimaryCta => "addPrimaryCta",
        AddFaqSection => "addFaqSection",
        MoveProofBeforeCta => "moveProofBeforeCta",
        EnableBlog => "enableBlog",
        AddContactPage => "addContactPage",
        FillEmptySection => "fillEmptySection",
        TightenHeroCopy => "tightenHeroCopy",
        SwitchHeroVariant => "switchHeroVariant",
        ApplyIntentTheme => "applyIntentTheme",
        LeaveAsIs => "leaveAsIs",
    }
}

keyed_enum! {
    /// Which part of the site a recommendation changes.
    pub enum Phase {
        Structure => "structure",
        Content => "content",
        Presentation => "presentation",
        None => "none",
    }
}

/// Scoring inputs (0..=5 each) and the weighted result.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub impact: f64,
    pub alignment: f64,
    pub confidence: f64,
    pub disruption: f64,
    pub score: f64,
}

/// A scored suggestion, optionally bound to a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: Uuid,
    pub recommendation_id: RecommendationKind,
    /// Dedup identity, stable across regenerations.
    pub key: String,
    pub phase: Phase,
    pub title: String,
    pub rationale: String,
    #[serde(default)]
    pub why_not: Vec<String>,
    pub scores: Scores,
    /// Tool invoked directly when the recommendation is chosen.
    pub action: Option<ToolCall>,
    /// Section whose copy is drafted when a content recommendation is chosen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_section: Option<Uuid>,
}

impl Recommendation {
    /// Whether choosing this recommendation changes anything.
    pub fn is_actionable(&self) -> bool {
        self.action.is_some() || self.focus_section.is_some()
    }
}

keyed_enum! {
    pub enum RecommendationStatus {
        Proposed => "proposed",
        Accepted => "accepted",
        Rejected => "rejected",
        Deferred => "deferred",
    }
}

/// A persisted recommendation and its current status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRecord {
    pub site_id: SiteId,
    pub recommendation: Recommendation,
    pub status: RecommendationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-key outcome counts used by the eligibility filter. Every proposal is
/// its own record, so `deferred` counts how many times the key was deferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHistory {
    pub proposed: u32,
    pub accepted: u32,
    pub rejected: u32,
    pub deferred: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_keys() {
        assert_eq!(RecommendationKind::LeaveAsIs.key(), "leaveAsIs");
        assert_eq!(
            "moveProofBeforeCta".parse::<RecommendationKind>(),
            Ok(RecommendationKind::MoveProofBeforeCta)
        );
        assert_eq!(RecommendationKind::ALL.len(), 11);
    }

    #[test]
    fn test_recommendation_serializes_camel_case() {
        let rec = Recommendation {
            id: Uuid::now_v7(),
            recommendation_id: RecommendationKind::LeaveAsIs,
            key: "leaveAsIs:home".to_string(),
            phase: Phase::None,
            title: "Keep the hero".to_string(),
            rationale: "It already works".to_string(),
            why_not: vec![],
            scores: Scores::default(),
            action: None,
            focus_section: None,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["recommendationId"], "leaveAsIs");
        assert_eq!(json["phase"], "none");
        assert!(json["action"].is_null());
        assert!(!rec.is_actionable());
    }
}
