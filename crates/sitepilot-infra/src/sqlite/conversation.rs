//! SQLite conversation store.
//!
//! Named state slots are JSON text keyed by `(conversation_id, slot)`;
//! messages are append-only rows.

use chrono::Utc;
use sqlx::Row;

use sitepilot_core::repository::conversation::ConversationStore;
use sitepilot_types::conversation::{ConversationId, ConversationMessage};
use sitepilot_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime, parse_key, parse_uuid, query_err};

/// SQLite-backed implementation of `ConversationStore`.
pub struct SqliteConversationStore {
    pool: DatabasePool,
}

impl SqliteConversationStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct MessageRow {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    mode: Option<String>,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            mode: row.try_get("mode")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ConversationMessage, RepositoryError> {
        Ok(ConversationMessage {
            id: parse_uuid(&self.id)?,
            conversation_id: ConversationId::from_uuid(parse_uuid(&self.conversation_id)?),
            role: parse_key("role", &self.role)?,
            content: self.content,
            mode: self.mode,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

impl ConversationStore for SqliteConversationStore {
    async fn load_slot(
        &self,
        conversation_id: &ConversationId,
        slot: &str,
    ) -> Result<Option<serde_json::Value>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM conversation_slots WHERE conversation_id = ? AND slot = ?")
            .bind(conversation_id.to_string())
            .bind(slot)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value").map_err(query_err)?;
                serde_json::from_str(&raw)
                    .map(Some)
                    .map_err(|e| RepositoryError::Query(format!("invalid JSON in slot '{slot}': {e}")))
            }
            None => Ok(None),
        }
    }

    async fn save_slot(
        &self,
        conversation_id: &ConversationId,
        slot: &str,
        value: &serde_json::Value,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO conversation_slots (conversation_id, slot, value, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (conversation_id, slot) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(conversation_id.to_string())
        .bind(slot)
        .bind(value.to_string())
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }

    async fn clear_slot(&self, conversation_id: &ConversationId, slot: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM conversation_slots WHERE conversation_id = ? AND slot = ?")
            .bind(conversation_id.to_string())
            .bind(slot)
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn append_message(&self, message: &ConversationMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO conversation_messages (id, conversation_id, role, content, mode, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.conversation_id.to_string())
        .bind(message.role.to_string())
        .bind(&message.content)
        .bind(&message.mode)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;
        Ok(())
    }

    async fn recent_messages(
        &self,
        conversation_id: &ConversationId,
        limit: u32,
    ) -> Result<Vec<ConversationMessage>, RepositoryError> {
        // UUID v7 ids sort by creation time, which breaks timestamp ties.
        let rows = sqlx::query(
            r#"SELECT id, conversation_id, role, content, mode, created_at
               FROM conversation_messages
               WHERE conversation_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(conversation_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut messages = rows
            .iter()
            .map(|row| MessageRow::from_row(row).map_err(query_err)?.into_message())
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_core::repository::conversation::ContractStore;
    use sitepilot_types::contract::{BlogPresence, IntakeContract};
    use sitepilot_types::llm::MessageRole;

    use crate::sqlite::test_pool;

    #[tokio::test]
    async fn test_slot_upsert_and_clear() {
        let store = SqliteConversationStore::new(test_pool().await);
        let id = ConversationId::new();

        assert!(store.load::<IntakeContract>(&id).await.unwrap().is_none());

        let mut intake = IntakeContract {
            purpose: Some("Pottery classes".to_string()),
            ..Default::default()
        };
        store.save(&id, &intake).await.unwrap();
        intake.blog_presence = Some(BlogPresence::Later);
        store.save(&id, &intake).await.unwrap();
        assert_eq!(store.load::<IntakeContract>(&id).await.unwrap(), Some(intake));

        store.clear::<IntakeContract>(&id).await.unwrap();
        assert!(store.load::<IntakeContract>(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slots_are_scoped_per_conversation() {
        let store = SqliteConversationStore::new(test_pool().await);
        let (a, b) = (ConversationId::new(), ConversationId::new());
        store.save_slot(&a, "meta", &serde_json::json!({"x": 1})).await.unwrap();
        assert!(store.load_slot(&b, "meta").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_messages_oldest_first_with_limit() {
        let store = SqliteConversationStore::new(test_pool().await);
        let id = ConversationId::new();
        for i in 0..5 {
            let role = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
            let mode = (role == MessageRole::Assistant).then(|| "clarifier".to_string());
            store
                .append_message(&ConversationMessage::new(id, role, format!("m{i}"), mode))
                .await
                .unwrap();
        }

        let recent = store.recent_messages(&id, 3).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
        assert_eq!(recent[1].mode.as_deref(), Some("clarifier"));
        assert_eq!(recent[1].role, MessageRole::Assistant);
    }
}
