//! Staged drafts and the tool calls they carry.
//!
//! Each tool family is a closed enum tagged by tool name, so a draft round-trips
//! through storage as `{"tool": "...", "args": {...}}` with a single
//! serialize/deserialize pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::SitePlan;
use crate::recommendation::{Phase, Recommendation};
use crate::site::{PageKind, SectionType, ThemePreset};

// ---------------------------------------------------------------------------
// Tool calls
// ---------------------------------------------------------------------------

/// Structural tools: pages and section ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "tool",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum StructureTool {
    CreateSiteFromPlan {
        plan: SitePlan,
    },
    AddPage {
        page: PageKind,
        goal: String,
        sections: Vec<SectionType>,
    },
    AddSection {
        page: PageKind,
        section_type: SectionType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<u32>,
    },
    ReorderSections {
        page: PageKind,
        order: Vec<SectionType>,
    },
    EnableBlog,
}

/// Content tools: typed section copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "tool",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ContentTool {
    GenerateSectionContent {
        section_id: Uuid,
        content: serde_json::Value,
    },
    RewriteSectionContent {
        section_id: Uuid,
        content: serde_json::Value,
    },
}

impl ContentTool {
    pub fn section_id(&self) -> Uuid {
        match self {
            ContentTool::GenerateSectionContent { section_id, .. }
            | ContentTool::RewriteSectionContent { section_id, .. } => *section_id,
        }
    }

    pub fn content(&self) -> &serde_json::Value {
        match self {
            ContentTool::GenerateSectionContent { content, .. }
            | ContentTool::RewriteSectionContent { content, .. } => content,
        }
    }
}

/// Presentation tools: theme preset and section variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "tool",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum PresentationTool {
    ApplyTheme { theme: ThemePreset },
    SwitchSectionVariant { section_id: Uuid, variant: String },
}

/// Release tools: preview, publish, rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "tool",
    content = "args",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ReleaseTool {
    CreatePreview { label: String },
    PublishSnapshot { snapshot_id: Uuid },
    RollbackToSnapshot { snapshot_id: Uuid },
}

/// Any mutation tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCall {
    Structure(StructureTool),
    Content(ContentTool),
    Presentation(PresentationTool),
    Release(ReleaseTool),
}

impl ToolCall {
    /// Wire name of the tool, as written to the mutation log.
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Structure(t) => match t {
                StructureTool::CreateSiteFromPlan { .. } => "createSiteFromPlan",
                StructureTool::AddPage { .. } => "addPage",
                StructureTool::AddSection { .. } => "addSection",
                StructureTool::ReorderSections { .. } => "reorderSections",
                StructureTool::EnableBlog => "enableBlog",
            },
            ToolCall::Content(t) => match t {
                ContentTool::GenerateSectionContent { .. } => "generateSectionContent",
                ContentTool::RewriteSectionContent { .. } => "rewriteSectionContent",
            },
            ToolCall::Presentation(t) => match t {
                PresentationTool::ApplyTheme { .. } => "applyTheme",
                PresentationTool::SwitchSectionVariant { .. } => "switchSectionVariant",
            },
            ToolCall::Release(t) => match t {
                ReleaseTool::CreatePreview { .. } => "createPreview",
                ReleaseTool::PublishSnapshot { .. } => "publishSnapshot",
                ReleaseTool::RollbackToSnapshot { .. } => "rollbackToSnapshot",
            },
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            ToolCall::Structure(_) => Phase::Structure,
            ToolCall::Content(_) => Phase::Content,
            ToolCall::Presentation(_) | ToolCall::Release(_) => Phase::Presentation,
        }
    }

    /// Just the arguments object, as written to the mutation log.
    pub fn arguments(&self) -> serde_json::Value {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut v| v.get_mut("args").map(serde_json::Value::take))
            .unwrap_or_else(|| serde_json::json!({}))
    }
}

impl From<StructureTool> for ToolCall {
    fn from(t: StructureTool) -> Self {
        ToolCall::Structure(t)
    }
}

impl From<ContentTool> for ToolCall {
    fn from(t: ContentTool) -> Self {
        ToolCall::Content(t)
    }
}

impl From<PresentationTool> for ToolCall {
    fn from(t: PresentationTool) -> Self {
        ToolCall::Presentation(t)
    }
}

impl From<ReleaseTool> for ToolCall {
    fn from(t: ReleaseTool) -> Self {
        ToolCall::Release(t)
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

keyed_enum! {
    /// The four disjoint draft kinds. At most one of each is pending per conversation.
    pub enum DraftKind {
        Content => "content",
        Presentation => "presentation",
        Release => "release",
        Recommendation => "recommendation",
    }
}

/// A recommendation chosen from a set, and the actionable siblings it beat.
/// Recorded once the change it leads to is applied or turned down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationChoice {
    pub chosen: Uuid,
    pub others: Vec<Uuid>,
}

/// A staged, validated tool call awaiting explicit confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft<T> {
    #[serde(flatten)]
    pub tool: T,
    pub rationale: String,
    pub staged_at: DateTime<Utc>,
    /// Set when the draft came from a recommendation choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<RecommendationChoice>,
}

impl<T> Draft<T> {
    pub fn new(tool: T, rationale: impl Into<String>) -> Self {
        Self {
            tool,
            rationale: rationale.into(),
            staged_at: Utc::now(),
            recommendation: None,
        }
    }

    pub fn with_recommendation(mut self, choice: Option<RecommendationChoice>) -> Self {
        self.recommendation = choice;
        self
    }
}

pub type ContentDraft = Draft<ContentTool>;
pub type PresentationDraft = Draft<PresentationTool>;
pub type ReleaseDraft = Draft<ReleaseTool>;

/// A ranked set of recommendations awaiting a numbered choice.
///
/// The last entry is always the non-actionable "leave as is" option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationDraft {
    pub recommendations: Vec<Recommendation>,
    pub rationale: String,
    pub staged_at: DateTime<Utc>,
    /// Zero-based index of a chosen content recommendation that is waiting
    /// for the voice contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awaiting_voice: Option<usize>,
}

impl RecommendationDraft {
    pub fn new(recommendations: Vec<Recommendation>, rationale: impl Into<String>) -> Self {
        Self {
            recommendations,
            rationale: rationale.into(),
            staged_at: Utc::now(),
            awaiting_voice: None,
        }
    }

    /// Recommendations that change something when chosen.
    pub fn actionable(&self) -> impl Iterator<Item = &Recommendation> {
        self.recommendations.iter().filter(|r| r.is_actionable())
    }
}
