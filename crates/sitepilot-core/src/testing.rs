//! Test doubles: a scripted LLM provider and in-memory repositories.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use sitepilot_types::audit::AuditRun;
use sitepilot_types::conversation::{ConversationId, ConversationMessage};
use sitepilot_types::error::RepositoryError;
use sitepilot_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason,
    StreamEvent, Usage,
};
use sitepilot_types::recommendation::{RecommendationRecord, RecommendationStatus};
use sitepilot_types::site::{Site, SiteData, SiteId};
use sitepilot_types::snapshot::{MutationLogEntry, Snapshot};
use uuid::Uuid;

use crate::llm::provider::{LlmEventStream, LlmProvider};
use crate::repository::conversation::ConversationStore;
use crate::repository::insight::InsightRepository;
use crate::repository::site::SiteRepository;

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

/// Replies with a fixed script, one entry per call, and records every request.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
    capabilities: ProviderCapabilities,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<String>) -> Self {
        Self::with_results(replies.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
            capabilities: ProviderCapabilities {
                streaming: true,
                max_context_tokens: 200_000,
                max_output_tokens: 8192,
            },
        }
    }

    /// Shared handle to the recorded requests.
    pub fn calls(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.calls.clone()
    }

    fn next(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(LlmError::InvalidRequest("script exhausted".to_string()))
            })
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let content = self.next(request)?;
        Ok(CompletionResponse {
            id: format!("msg_{}", Uuid::now_v7()),
            content,
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 10,
            },
        })
    }

    fn stream(&self, request: CompletionRequest) -> LlmEventStream {
        let reply = self.next(&request);
        Box::pin(async_stream::stream! {
            let text = match reply {
                Ok(text) => text,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            yield Ok(StreamEvent::Connected);
            let chars: Vec<char> = text.chars().collect();
            for chunk in chars.chunks(7) {
                yield Ok(StreamEvent::TextDelta { text: chunk.iter().collect() });
            }
            yield Ok(StreamEvent::MessageDelta { stop_reason: StopReason::EndTurn });
            yield Ok(StreamEvent::Done);
        })
    }
}

// ---------------------------------------------------------------------------
// InMemoryConversationStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryConversationStore {
    slots: Mutex<HashMap<(ConversationId, String), serde_json::Value>>,
    messages: Mutex<Vec<ConversationMessage>>,
}

impl InMemoryConversationStore {
    pub fn messages(&self, conversation_id: &ConversationId) -> Vec<ConversationMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == *conversation_id)
            .cloned()
            .collect()
    }
}

impl ConversationStore for InMemoryConversationStore {
    async fn load_slot(
        &self,
        conversation_id: &ConversationId,
        slot: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        Ok(self
            .slots
            .lock()
            .unwrap()
            .get(&(*conversation_id, slot.to_string()))
            .cloned())
    }

    async fn save_slot(
        &self,
        conversation_id: &ConversationId,
        slot: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        self.slots
            .lock()
            .unwrap()
            .insert((*conversation_id, slot.to_string()), value.clone());
        Ok(())
    }

    async fn clear_slot(&self, conversation_id: &ConversationId, slot: &str) -> Result<(), RepositoryError> {
        self.slots
            .lock()
            .unwrap()
            .remove(&(*conversation_id, slot.to_string()));
        Ok(())
    }

    async fn append_message(&self, message: &ConversationMessage) -> Result<(), RepositoryError> {
        self.messages.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn recent_messages(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        let all = self.messages(conversation_id);
        let skip = all.len().saturating_sub(limit as usize);
        Ok(all.into_iter().skip(skip).collect())
    }
}

// ---------------------------------------------------------------------------
// InMemorySiteRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemorySiteRepository {
    sites: Mutex<HashMap<SiteId, (Site, SiteData)>>,
    snapshots: Mutex<Vec<Snapshot>>,
    log: Mutex<Vec<MutationLogEntry>>,
}

impl InMemorySiteRepository {
    pub fn site_ids(&self) -> Vec<SiteId> {
        self.sites.lock().unwrap().keys().copied().collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

impl SiteRepository for InMemorySiteRepository {
    async fn create_site(&self, site: &Site, data: &SiteData) -> Result<(), RepositoryError> {
        let mut sites = self.sites.lock().unwrap();
        if sites.contains_key(&site.id) {
            return Err(RepositoryError::Conflict(format!("site {} exists", site.id)));
        }
        sites.insert(site.id, (site.clone(), data.clone()));
        Ok(())
    }

    async fn get_site(&self, id: &SiteId) -> Result<Option<Site>, RepositoryError> {
        Ok(self.sites.lock().unwrap().get(id).map(|(s, _)| s.clone()))
    }

    async fn load_data(&self, id: &SiteId) -> Result<Option<SiteData>, RepositoryError> {
        Ok(self.sites.lock().unwrap().get(id).map(|(_, d)| d.clone()))
    }

    async fn commit(&self, entry: &MutationLogEntry, snapshot: Option<&Snapshot>) -> Result<(), RepositoryError> {
        let mut sites = self.sites.lock().unwrap();
        let (site, data) = sites.get_mut(&entry.site_id).ok_or(RepositoryError::NotFound)?;
        *data = entry.after.data.clone();
        site.theme = entry.after.data.theme;
        site.release_status = entry.after.release_status;
        site.current_published_snapshot_id = entry.after.current_published_snapshot_id;
        site.updated_at = entry.created_at;
        if let Some(snapshot) = snapshot {
            self.snapshots.lock().unwrap().push(snapshot.clone());
        }
        self.log.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn get_snapshot(&self, id: &Uuid) -> Result<Option<Snapshot>, RepositoryError> {
        Ok(self.snapshots.lock().unwrap().iter().find(|s| s.id == *id).cloned())
    }

    async fn list_snapshots(&self, site_id: &SiteId) -> Result<Vec<Snapshot>, RepositoryError> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|s| s.site_id == *site_id)
            .cloned()
            .collect())
    }

    async fn list_mutations(&self, site_id: &SiteId, limit: u32) -> Result<Vec<MutationLogEntry>, RepositoryError> {
        Ok(self
            .log
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.site_id == *site_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// InMemoryInsightRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryInsightRepository {
    recommendations: Mutex<Vec<RecommendationRecord>>,
    audits: Mutex<Vec<AuditRun>>,
}

impl InsightRepository for InMemoryInsightRepository {
    async fn save_recommendations(&self, records: &[RecommendationRecord]) -> Result<(), RepositoryError> {
        self.recommendations.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn set_recommendation_status(
        &self,
        recommendation_id: &Uuid,
        status: RecommendationStatus,
    ) -> Result<(), RepositoryError> {
        let mut records = self.recommendations.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.recommendation.id == *recommendation_id)
            .ok_or(RepositoryError::NotFound)?;
        record.status = status;
        record.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn list_recommendations(&self, site_id: &SiteId) -> Result<Vec<RecommendationRecord>, RepositoryError> {
        Ok(self
            .recommendations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.site_id == *site_id)
            .cloned()
            .collect())
    }

    async fn save_audit_run(&self, run: &AuditRun) -> Result<(), RepositoryError> {
        self.audits.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn list_audit_runs(&self, site_id: &SiteId) -> Result<Vec<AuditRun>, RepositoryError> {
        Ok(self
            .audits
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.site_id == *site_id)
            .cloned()
            .collect())
    }
}
