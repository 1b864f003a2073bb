//! Application state wiring the stores and the orchestrator together.
//!
//! The orchestrator is generic over its repositories; `AppState` pins it to
//! the SQLite implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use sitepilot_core::llm::box_provider::BoxLlmProvider;
use sitepilot_core::orchestrator::TurnOrchestrator;
use sitepilot_infra::config::{api_key_from_env, load_config, resolve_data_dir};
use sitepilot_infra::llm::{API_KEY_ENV, create_provider};
use sitepilot_infra::sqlite::api_key::SqliteApiKeyStore;
use sitepilot_infra::sqlite::conversation::SqliteConversationStore;
use sitepilot_infra::sqlite::insight::SqliteInsightRepository;
use sitepilot_infra::sqlite::pool::{DatabasePool, database_url};
use sitepilot_infra::sqlite::site::SqliteSiteRepository;
use sitepilot_types::config::SitePilotConfig;
use sitepilot_types::conversation::ConversationId;

pub type ConcreteOrchestrator =
    TurnOrchestrator<SqliteConversationStore, SqliteSiteRepository, SqliteInsightRepository>;

/// Data directory, configuration and database. Enough for read-only commands.
#[derive(Clone)]
pub struct Storage {
    pub data_dir: PathBuf,
    pub config: SitePilotConfig,
    pub db_pool: DatabasePool,
}

impl Storage {
    pub async fn open() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;
        let db_pool = DatabasePool::new(&database_url(&data_dir))
            .await
            .context("opening the SitePilot database")?;

        Ok(Self {
            data_dir,
            config,
            db_pool,
        })
    }
}

/// Shared state for the HTTP server and the interactive chat.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ConcreteOrchestrator>,
    pub sites: Arc<SqliteSiteRepository>,
    pub api_keys: Arc<SqliteApiKeyStore>,
    /// One in-flight turn per conversation; later requests wait their turn.
    pub turn_locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
    pub storage: Storage,
}

impl AppState {
    /// Open storage and connect the generative provider from `ANTHROPIC_API_KEY`.
    pub async fn init() -> anyhow::Result<Self> {
        let storage = Storage::open().await?;
        let provider = create_provider(&storage.config.model, api_key_from_env())
            .with_context(|| format!("set {API_KEY_ENV} to use the co-pilot"))?;
        Ok(Self::from_parts(storage, provider))
    }

    pub fn from_parts(storage: Storage, provider: BoxLlmProvider) -> Self {
        let pool = storage.db_pool.clone();
        let sites = Arc::new(SqliteSiteRepository::new(pool.clone()));
        let orchestrator = TurnOrchestrator::new(
            Arc::new(SqliteConversationStore::new(pool.clone())),
            sites.clone(),
            Arc::new(SqliteInsightRepository::new(pool.clone())),
            Arc::new(provider),
            &storage.config,
        );

        Self {
            orchestrator: Arc::new(orchestrator),
            sites,
            api_keys: Arc::new(SqliteApiKeyStore::new(pool)),
            turn_locks: Arc::new(DashMap::new()),
            storage,
        }
    }

    /// Wait for the conversation's turn lock. Dropping the guard frees the
    /// lock and removes its map entry once nobody else waits on it.
    pub async fn acquire_turn(&self, conversation_id: ConversationId) -> TurnGuard {
        TurnGuard::acquire(self.turn_locks.clone(), conversation_id).await
    }
}

/// One conversation's turn lock, held for the lifetime of a turn.
pub struct TurnGuard {
    locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
    conversation_id: ConversationId,
    held: Option<OwnedMutexGuard<()>>,
}

impl TurnGuard {
    pub async fn acquire(
        locks: Arc<DashMap<ConversationId, Arc<Mutex<()>>>>,
        conversation_id: ConversationId,
    ) -> Self {
        let lock = locks
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let held = lock.lock_owned().await;
        Self {
            locks,
            conversation_id,
            held: Some(held),
        }
    }
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        // The owned guard keeps its own Arc; release it before counting.
        drop(self.held.take());
        self.locks
            .remove_if(&self.conversation_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
