//! Structural site plans: which pages exist and which sections they carry, in
//! order. A plan never carries copy or styling.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::site::{PageKind, SectionType};

/// The intended structure of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PagePlan {
    pub goal: String,
    pub ordered_sections: Vec<SectionType>,
}

/// A whole-site structure, keyed by page id.
///
/// Page order is not part of a plan: pages iterate, render and get created
/// in canonical `PageKind` order whatever order the plan listed them in.
/// Section order within a page is kept exactly as given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SitePlan {
    pub pages: BTreeMap<PageKind, PagePlan>,
}

impl SitePlan {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn section_count(&self) -> usize {
        self.pages.values().map(|p| p.ordered_sections.len()).sum()
    }
}

/// Lifecycle of a proposed plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Proposed,
    Applied,
    Discarded,
}

/// The plan slot of a conversation: the latest plan and where it stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePlanState {
    pub plan: SitePlan,
    pub status: PlanStatus,
    pub rationale: String,
    pub proposed_at: DateTime<Utc>,
}

impl SitePlanState {
    pub fn proposed(plan: SitePlan, rationale: impl Into<String>) -> Self {
        Self {
            plan,
            status: PlanStatus::Proposed,
            rationale: rationale.into(),
            proposed_at: Utc::now(),
        }
    }

    /// A proposed plan awaits confirmation exactly like a staged draft.
    pub fn is_pending(&self) -> bool {
        self.status == PlanStatus::Proposed
    }

    pub fn is_applied(&self) -> bool {
        self.status == PlanStatus::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_wire_shape() {
        let json = serde_json::json!({
            "pages": {
                "contact": { "goal": "get in touch", "orderedSections": ["heroMinimal", "contact"] },
                "home": { "goal": "explain the offer", "orderedSections": ["heroSplit", "features", "ctaPrimary"] }
            }
        });
        let plan: SitePlan = serde_json::from_value(json).unwrap();
        let kinds: Vec<_> = plan.pages.keys().copied().collect();
        assert_eq!(kinds, vec![PageKind::Home, PageKind::Contact]);
        assert_eq!(plan.section_count(), 5);
    }

    #[test]
    fn test_pages_follow_canonical_order_sections_keep_plan_order() {
        let json = serde_json::json!({
            "pages": {
                "faq": { "goal": "answer doubts", "orderedSections": ["heroMinimal", "faq"] },
                "about": { "goal": "build trust", "orderedSections": ["heroMinimal", "testimonials", "features"] },
                "home": { "goal": "explain the offer", "orderedSections": ["heroSplit", "ctaPrimary"] }
            }
        });
        let plan: SitePlan = serde_json::from_value(json).unwrap();
        let kinds: Vec<_> = plan.pages.keys().copied().collect();
        assert_eq!(kinds, vec![PageKind::Home, PageKind::About, PageKind::Faq]);
        assert_eq!(
            plan.pages[&PageKind::About].ordered_sections,
            vec![SectionType::HeroMinimal, SectionType::Testimonials, SectionType::Features]
        );
    }

    #[test]
    fn test_plan_rejects_unknown_page_fields() {
        let json = serde_json::json!({
            "pages": {
                "home": { "goal": "g", "orderedSections": ["heroSplit"], "headline": "Hi" }
            }
        });
        assert!(serde_json::from_value::<SitePlan>(json).is_err());
    }

    #[test]
    fn test_plan_state_pending() {
        let mut state = SitePlanState::proposed(SitePlan::default(), "starter");
        assert!(state.is_pending());
        state.status = PlanStatus::Applied;
        assert!(!state.is_pending());
        assert!(state.is_applied());
    }
}
