//! API keys that resolve to a verified user id.
//!
//! Only the SHA-256 hash of a key is stored. The plaintext is returned once,
//! when the key is created.

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::Row;
use uuid::Uuid;

use sitepilot_types::error::RepositoryError;

use super::pool::DatabasePool;
use super::{format_datetime, query_err};

const KEY_PREFIX: &str = "sp_";

/// Compute the SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

pub struct SqliteApiKeyStore {
    pool: DatabasePool,
}

impl SqliteApiKeyStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Create a key for `user_id` and return its plaintext.
    pub async fn create_key(&self, name: &str, user_id: &str) -> Result<String, RepositoryError> {
        let plaintext = format!(
            "{KEY_PREFIX}{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        );
        sqlx::query("INSERT INTO api_keys (id, name, user_id, key_hash, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(Uuid::now_v7().to_string())
            .bind(name)
            .bind(user_id)
            .bind(hash_api_key(&plaintext))
            .bind(format_datetime(&Utc::now()))
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(plaintext)
    }

    /// The user id a key belongs to, or `None` for an unknown key.
    pub async fn resolve(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT id, user_id FROM api_keys WHERE key_hash = ?")
            .bind(hash_api_key(key.trim()))
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: String = row.try_get("id").map_err(query_err)?;
        let user_id: String = row.try_get("user_id").map_err(query_err)?;

        // Best effort; a failed timestamp update never rejects a valid key.
        if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(format_datetime(&Utc::now()))
            .bind(&id)
            .execute(&self.pool.writer)
            .await
        {
            tracing::warn!(error = %e, "Failed to record API key use");
        }
        Ok(Some(user_id))
    }
}
