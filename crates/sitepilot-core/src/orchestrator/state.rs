//! Per-turn conversation state, loaded slot by slot from the store.

use sitepilot_types::contract::{DesignIntent, DesignIntentState, IntakeContract, VoiceContract};
use sitepilot_types::conversation::{ConversationId, ConversationMessage, ConversationMeta};
use sitepilot_types::draft::{ContentDraft, DraftKind, PresentationDraft, RecommendationDraft, ReleaseDraft};
use sitepilot_types::error::RepositoryError;
use sitepilot_types::plan::SitePlanState;

use crate::repository::conversation::{ContractSlot, ContractStore, ConversationStore};

/// Something staged that the next reply must resolve first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    Plan,
    Draft(DraftKind),
}

/// Everything a turn reads before deciding what to do.
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    pub intake: IntakeContract,
    pub intent: Option<DesignIntentState>,
    pub voice: VoiceContract,
    pub plan: Option<SitePlanState>,
    pub content_draft: Option<ContentDraft>,
    pub presentation_draft: Option<PresentationDraft>,
    pub release_draft: Option<ReleaseDraft>,
    pub recommendation_draft: Option<RecommendationDraft>,
    pub meta: ConversationMeta,
    /// Recent messages, oldest first.
    pub history: Vec<ConversationMessage>,
}

impl TurnState {
    pub async fn load<C: ConversationStore>(
        store: &C,
        conversation_id: &ConversationId,
        history_limit: u32,
    ) -> Result<Self, RepositoryError> {
        Ok(Self {
            intake: store.load::<IntakeContract>(conversation_id).await?.unwrap_or_default(),
            intent: store.load::<DesignIntentState>(conversation_id).await?,
            voice: store.load::<VoiceContract>(conversation_id).await?.unwrap_or_default(),
            plan: store.load::<SitePlanState>(conversation_id).await?,
            content_draft: store.load::<ContentDraft>(conversation_id).await?,
            presentation_draft: store.load::<PresentationDraft>(conversation_id).await?,
            release_draft: store.load::<ReleaseDraft>(conversation_id).await?,
            recommendation_draft: store.load::<RecommendationDraft>(conversation_id).await?,
            meta: store.load::<ConversationMeta>(conversation_id).await?.unwrap_or_default(),
            history: store.recent_messages(conversation_id, history_limit).await?,
        })
    }

    /// The staged item awaiting a reply, if any. At most one is ever staged.
    pub fn pending(&self) -> Option<Pending> {
        if self.plan.as_ref().is_some_and(|p| p.is_pending()) {
            Some(Pending::Plan)
        } else if self.content_draft.is_some() {
            Some(Pending::Draft(DraftKind::Content))
        } else if self.presentation_draft.is_some() {
            Some(Pending::Draft(DraftKind::Presentation))
        } else if self.release_draft.is_some() {
            Some(Pending::Draft(DraftKind::Release))
        } else if self.recommendation_draft.is_some() {
            Some(Pending::Draft(DraftKind::Recommendation))
        } else {
            None
        }
    }

    /// The design intent once locked.
    pub fn locked_intent(&self) -> Option<&DesignIntent> {
        self.intent.as_ref().filter(|s| s.locked).map(|s| &s.intent)
    }

    /// Persist every slot that differs from `before`. Cleared slots are
    /// removed from the store; history is append-only and not touched here.
    pub async fn save_changes<C: ConversationStore>(
        &self,
        store: &C,
        conversation_id: &ConversationId,
        before: &TurnState,
    ) -> Result<(), RepositoryError> {
        let id = conversation_id;
        sync(store, id, Some(&self.intake), Some(&before.intake)).await?;
        sync(store, id, self.intent.as_ref(), before.intent.as_ref()).await?;
        sync(store, id, Some(&self.voice), Some(&before.voice)).await?;
        sync(store, id, self.plan.as_ref(), before.plan.as_ref()).await?;
        sync(store, id, self.content_draft.as_ref(), before.content_draft.as_ref()).await?;
        sync(
            store,
            id,
            self.presentation_draft.as_ref(),
            before.presentation_draft.as_ref(),
        )
        .await?;
        sync(store, id, self.release_draft.as_ref(), before.release_draft.as_ref()).await?;
        sync(
            store,
            id,
            self.recommendation_draft.as_ref(),
            before.recommendation_draft.as_ref(),
        )
        .await?;
        sync(store, id, Some(&self.meta), Some(&before.meta)).await
    }
}

async fn sync<C: ConversationStore, T: ContractSlot + PartialEq>(
    store: &C,
    conversation_id: &ConversationId,
    now: Option<&T>,
    before: Option<&T>,
) -> Result<(), RepositoryError> {
    if now == before {
        return Ok(());
    }
    match now {
        Some(value) => store.save(conversation_id, value).await,
        None => store.clear::<T>(conversation_id).await,
    }
}
