//! The message-turn envelope: request, response, and streaming records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::draft::DraftKind;

/// Which sub-protocol owned a turn.
///
/// Serialized as a flat string (`"clarifier"`, `"content_draft"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TurnMode {
    Clarifier,
    DesignIntent,
    Ready,
    Voice,
    Planner,
    Audit,
    Advisor,
    Draft(DraftKind),
}

impl fmt::Display for TurnMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnMode::Clarifier => write!(f, "clarifier"),
            TurnMode::DesignIntent => write!(f, "design_intent"),
            TurnMode::Ready => write!(f, "ready"),
            TurnMode::Voice => write!(f, "voice"),
            TurnMode::Planner => write!(f, "planner"),
            TurnMode::Audit => write!(f, "audit"),
            TurnMode::Advisor => write!(f, "advisor"),
            TurnMode::Draft(kind) => write!(f, "{kind}_draft"),
        }
    }
}

impl FromStr for TurnMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clarifier" => Ok(TurnMode::Clarifier),
            "design_intent" => Ok(TurnMode::DesignIntent),
            "ready" => Ok(TurnMode::Ready),
            "voice" => Ok(TurnMode::Voice),
            "planner" => Ok(TurnMode::Planner),
            "audit" => Ok(TurnMode::Audit),
            "advisor" => Ok(TurnMode::Advisor),
            other => other
                .strip_suffix("_draft")
                .and_then(|kind| kind.parse::<DraftKind>().ok())
                .map(TurnMode::Draft)
                .ok_or_else(|| format!("invalid turn mode: '{other}'")),
        }
    }
}

impl From<TurnMode> for String {
    fn from(mode: TurnMode) -> Self {
        mode.to_string()
    }
}

impl TryFrom<String> for TurnMode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Inbound message-turn request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    /// Optional focus hint (a page id or section id) for content and
    /// presentation requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Outbound message-turn envelope.
///
/// Mode-specific fields (the staged draft, audit findings, the proposed plan,
/// ...) are flattened next to the fixed fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    pub conversation_id: String,
    pub mode: TurnMode,
    pub user_message: String,
    pub assistant_message: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

/// One newline-delimited record of the streaming content-draft variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamRecord {
    /// A top-level content field that finished parsing.
    Patch {
        path: String,
        value: serde_json::Value,
    },
    /// The terminal record carrying the full turn envelope.
    Final {
        #[serde(rename = "__final__")]
        final_object: serde_json::Value,
    },
    /// Terminal failure; nothing was staged.
    Error {
        #[serde(rename = "__error__")]
        message: String,
    },
}
