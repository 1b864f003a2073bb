use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::llm::MessageRole;
use crate::site::SiteId;

/// Unique identifier for a conversation, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A persisted message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: Uuid,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: String,
    /// Mode key of the turn that produced an assistant message.
    pub mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn new(
        conversation_id: ConversationId,
        role: MessageRole,
        content: impl Into<String>,
        mode: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            conversation_id,
            role,
            content: content.into(),
            mode,
            created_at: Utc::now(),
        }
    }
}

/// Which structured questionnaire the previous assistant turn asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Awaiting {
    Intake,
    Voice,
}

keyed_enum! {
    /// Whether recommendations are offered unprompted after each applied draft.
    pub enum AdvisoryMode {
        Quiet => "quiet",
        Proactive => "proactive",
    }
}

impl Default for AdvisoryMode {
    fn default() -> Self {
        AdvisoryMode::Quiet
    }
}

/// Bookkeeping slot for a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMeta {
    pub site_id: Option<SiteId>,
    pub awaiting: Option<Awaiting>,
    #[serde(default)]
    pub advisory_mode: AdvisoryMode,
    /// The content request that was interrupted by voice intake; replayed once
    /// the voice contract is complete.
    pub deferred_request: Option<String>,
}
