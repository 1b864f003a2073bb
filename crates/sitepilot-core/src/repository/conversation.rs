//! Conversation state: named contract/draft slots and message history.
//!
//! Every sub-protocol loads and re-persists its own named slice of state; the
//! orchestrator keeps nothing in memory between turns.

use serde::Serialize;
use serde::de::DeserializeOwned;

use sitepilot_types::contract::{DesignIntentState, IntakeContract, VoiceContract};
use sitepilot_types::conversation::{ConversationId, ConversationMessage, ConversationMeta};
use sitepilot_types::draft::{ContentDraft, PresentationDraft, RecommendationDraft, ReleaseDraft};
use sitepilot_types::error::RepositoryError;
use sitepilot_types::plan::SitePlanState;

/// Repository trait for per-conversation state.
///
/// Implementations live in sitepilot-infra (e.g., SqliteConversationStore).
pub trait ConversationStore: Send + Sync {
    /// Load the raw JSON stored under `slot`, if any.
    fn load_slot(
        &self,
        conversation_id: &ConversationId,
        slot: &str,
    ) -> impl std::future::Future<Output = Result<Option<serde_json::Value>, RepositoryError>> + Send;

    /// Insert or replace the value stored under `slot`.
    fn save_slot(
        &self,
        conversation_id: &ConversationId,
        slot: &str,
        value: &serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn clear_slot(
        &self,
        conversation_id: &ConversationId,
        slot: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn append_message(
        &self,
        message: &ConversationMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The most recent `limit` messages, oldest first.
    fn recent_messages(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<ConversationMessage>, RepositoryError>> + Send;
}

/// A value persisted under a fixed slot name.
pub trait ContractSlot: Serialize + DeserializeOwned + Send + Sync {
    const SLOT: &'static str;
}

impl ContractSlot for IntakeContract {
    const SLOT: &'static str = "intake";
}

impl ContractSlot for DesignIntentState {
    const SLOT: &'static str = "design_intent";
}

impl ContractSlot for VoiceContract {
    const SLOT: &'static str = "voice";
}

impl ContractSlot for SitePlanState {
    const SLOT: &'static str = "site_plan";
}

impl ContractSlot for ContentDraft {
    const SLOT: &'static str = "draft.content";
}

impl ContractSlot for PresentationDraft {
    const SLOT: &'static str = "draft.presentation";
}

impl ContractSlot for ReleaseDraft {
    const SLOT: &'static str = "draft.release";
}

impl ContractSlot for RecommendationDraft {
    const SLOT: &'static str = "draft.recommendation";
}

impl ContractSlot for ConversationMeta {
    const SLOT: &'static str = "meta";
}

/// Typed access to contract slots, for every [`ConversationStore`].
pub trait ContractStore: ConversationStore {
    fn load<T: ContractSlot>(
        &self,
        conversation_id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<Option<T>, RepositoryError>> + Send {
        async move {
            let Some(raw) = self.load_slot(conversation_id, T::SLOT).await? else {
                return Ok(None);
            };
            serde_json::from_value(raw)
                .map(Some)
                .map_err(|e| RepositoryError::Query(format!("corrupt '{}' slot: {e}", T::SLOT)))
        }
    }

    fn save<T: ContractSlot>(
        &self,
        conversation_id: &ConversationId,
        value: &T,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send {
        async move {
            let raw = serde_json::to_value(value)
                .map_err(|e| RepositoryError::Query(format!("cannot encode '{}' slot: {e}", T::SLOT)))?;
            self.save_slot(conversation_id, T::SLOT, &raw).await
        }
    }

    fn clear<T: ContractSlot>(
        &self,
        conversation_id: &ConversationId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send {
        self.clear_slot(conversation_id, T::SLOT)
    }
}

impl<S: ConversationStore + ?Sized> ContractStore for S {}
