//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod api_key;
pub mod conversation;
pub mod insight;
pub mod pool;
pub mod site;

use chrono::{DateTime, Utc};
use sitepilot_types::error::RepositoryError;
use uuid::Uuid;

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid uuid: {e}")))
}

/// Decode a keyed enum or other `FromStr` column.
pub(crate) fn parse_key<T>(column: &str, s: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.parse()
        .map_err(|e| RepositoryError::Query(format!("invalid {column}: {e}")))
}

pub(crate) fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

pub(crate) fn to_json<T: serde::Serialize>(column: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| RepositoryError::Query(format!("failed to serialize {column}: {e}")))
}

pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    column: &str,
    s: &str,
) -> Result<T, RepositoryError> {
    serde_json::from_str(s).map_err(|e| RepositoryError::Query(format!("invalid JSON in {column}: {e}")))
}

#[cfg(test)]
pub(crate) async fn test_pool() -> pool::DatabasePool {
    let dir = tempfile::tempdir().unwrap();
    let url = pool::database_url(dir.path());
    std::mem::forget(dir);
    pool::DatabasePool::new(&url).await.unwrap()
}
