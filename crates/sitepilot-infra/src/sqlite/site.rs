//! SQLite site repository.
//!
//! Pages and sections are stored as rows; snapshots and the before/after
//! captures of the mutation log are stored as JSON documents. A tool commit
//! rewrites the site's pages and sections, inserts any new snapshot and
//! appends the log entry inside one transaction.

use chrono::Utc;
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use sitepilot_core::repository::site::SiteRepository;
use sitepilot_types::conversation::ConversationId;
use sitepilot_types::error::RepositoryError;
use sitepilot_types::site::{Page, Section, Site, SiteData, SiteId};
use sitepilot_types::snapshot::{MutationLogEntry, Snapshot};

use super::pool::DatabasePool;
use super::{format_datetime, from_json, parse_datetime, parse_key, parse_uuid, query_err, to_json};

/// SQLite-backed implementation of `SiteRepository`.
pub struct SqliteSiteRepository {
    pool: DatabasePool,
}

impl SqliteSiteRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// The site created for a conversation, if any.
    pub async fn site_for_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<Site>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sites WHERE conversation_id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;
        row.map(|r| SiteRow::from_row(&r).map_err(query_err)?.into_site())
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

struct SiteRow {
    id: String,
    conversation_id: String,
    owner_user_id: Option<String>,
    name: String,
    theme: String,
    release_status: String,
    current_published_snapshot_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl SiteRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            conversation_id: row.try_get("conversation_id")?,
            owner_user_id: row.try_get("owner_user_id")?,
            name: row.try_get("name")?,
            theme: row.try_get("theme")?,
            release_status: row.try_get("release_status")?,
            current_published_snapshot_id: row.try_get("current_published_snapshot_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_site(self) -> Result<Site, RepositoryError> {
        Ok(Site {
            id: SiteId::from_uuid(parse_uuid(&self.id)?),
            conversation_id: ConversationId::from_uuid(parse_uuid(&self.conversation_id)?),
            owner_user_id: self.owner_user_id,
            name: self.name,
            theme: parse_key("theme", &self.theme)?,
            release_status: parse_key("release_status", &self.release_status)?,
            current_published_snapshot_id: self
                .current_published_snapshot_id
                .as_deref()
                .map(parse_uuid)
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct SnapshotRow {
    id: String,
    site_id: String,
    state: String,
    label: String,
    data: String,
    created_at: String,
}

impl SnapshotRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            site_id: row.try_get("site_id")?,
            state: row.try_get("state")?,
            label: row.try_get("label")?,
            data: row.try_get("data")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_snapshot(self) -> Result<Snapshot, RepositoryError> {
        Ok(Snapshot {
            id: parse_uuid(&self.id)?,
            site_id: SiteId::from_uuid(parse_uuid(&self.site_id)?),
            state: parse_key("state", &self.state)?,
            label: self.label,
            data: from_json("data", &self.data)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

struct MutationRow {
    id: String,
    site_id: String,
    tool: String,
    arguments: String,
    before: String,
    after: String,
    created_at: String,
}

impl MutationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            site_id: row.try_get("site_id")?,
            tool: row.try_get("tool")?,
            arguments: row.try_get("arguments")?,
            before: row.try_get("before")?,
            after: row.try_get("after")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_entry(self) -> Result<MutationLogEntry, RepositoryError> {
        Ok(MutationLogEntry {
            id: parse_uuid(&self.id)?,
            site_id: SiteId::from_uuid(parse_uuid(&self.site_id)?),
            tool: self.tool,
            arguments: from_json("arguments", &self.arguments)?,
            before: from_json("before", &self.before)?,
            after: from_json("after", &self.after)?,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Replace every page and section of a site within `tx`.
async fn write_pages(
    tx: &mut Transaction<'_, Sqlite>,
    site_id: &SiteId,
    data: &SiteData,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM sections WHERE site_id = ?")
        .bind(site_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(query_err)?;
    sqlx::query("DELETE FROM pages WHERE site_id = ?")
        .bind(site_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(query_err)?;

    for page in &data.pages {
        sqlx::query("INSERT INTO pages (site_id, kind, goal, position) VALUES (?, ?, ?, ?)")
            .bind(site_id.to_string())
            .bind(page.kind.key())
            .bind(&page.goal)
            .bind(page.position as i64)
            .execute(&mut **tx)
            .await
            .map_err(query_err)?;

        for section in &page.sections {
            let content = section
                .content
                .as_ref()
                .map(|c| to_json("content", c))
                .transpose()?;
            sqlx::query(
                r#"INSERT INTO sections (id, site_id, page_kind, section_type, position, variant, content)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(section.id.to_string())
            .bind(site_id.to_string())
            .bind(page.kind.key())
            .bind(section.section_type.key())
            .bind(section.position as i64)
            .bind(&section.variant)
            .bind(content)
            .execute(&mut **tx)
            .await
            .map_err(query_err)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SiteRepository implementation
// ---------------------------------------------------------------------------

impl SiteRepository for SqliteSiteRepository {
    async fn create_site(&self, site: &Site, data: &SiteData) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;

        sqlx::query(
            r#"INSERT INTO sites (id, conversation_id, owner_user_id, name, theme, release_status,
                                  current_published_snapshot_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(site.id.to_string())
        .bind(site.conversation_id.to_string())
        .bind(&site.owner_user_id)
        .bind(&site.name)
        .bind(data.theme.key())
        .bind(site.release_status.key())
        .bind(site.current_published_snapshot_id.map(|id| id.to_string()))
        .bind(format_datetime(&site.created_at))
        .bind(format_datetime(&site.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
                RepositoryError::Conflict(format!("conversation {} already has a site", site.conversation_id))
            } else {
                query_err(e)
            }
        })?;

        write_pages(&mut tx, &site.id, data).await?;
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_site(&self, id: &SiteId) -> Result<Option<Site>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM sites WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;
        row.map(|r| SiteRow::from_row(&r).map_err(query_err)?.into_site())
            .transpose()
    }

    async fn load_data(&self, id: &SiteId) -> Result<Option<SiteData>, RepositoryError> {
        let Some(site) = self.get_site(id).await? else {
            return Ok(None);
        };

        let page_rows = sqlx::query("SELECT kind, goal, position FROM pages WHERE site_id = ? ORDER BY position")
            .bind(id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;
        let section_rows = sqlx::query(
            r#"SELECT id, page_kind, section_type, position, variant, content
               FROM sections WHERE site_id = ? ORDER BY position"#,
        )
        .bind(id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut pages = Vec::with_capacity(page_rows.len());
        for row in &page_rows {
            let kind: String = row.try_get("kind").map_err(query_err)?;
            let position: i64 = row.try_get("position").map_err(query_err)?;
            pages.push(Page {
                kind: parse_key("page kind", &kind)?,
                goal: row.try_get("goal").map_err(query_err)?,
                position: position as u32,
                sections: Vec::new(),
            });
        }

        for row in &section_rows {
            let page_kind: String = row.try_get("page_kind").map_err(query_err)?;
            let page_kind = parse_key("page kind", &page_kind)?;
            let id: String = row.try_get("id").map_err(query_err)?;
            let section_type: String = row.try_get("section_type").map_err(query_err)?;
            let position: i64 = row.try_get("position").map_err(query_err)?;
            let content: Option<String> = row.try_get("content").map_err(query_err)?;
            let section = Section {
                id: parse_uuid(&id)?,
                section_type: parse_key("section type", &section_type)?,
                position: position as u32,
                variant: row.try_get("variant").map_err(query_err)?,
                content: content.as_deref().map(|c| from_json("content", c)).transpose()?,
            };
            let page = pages
                .iter_mut()
                .find(|p| p.kind == page_kind)
                .ok_or_else(|| RepositoryError::Query(format!("section {} has no page", section.id)))?;
            page.sections.push(section);
        }

        Ok(Some(SiteData {
            theme: site.theme,
            pages,
        }))
    }

    async fn commit(&self, entry: &MutationLogEntry, snapshot: Option<&Snapshot>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        let after = &entry.after;

        let updated = sqlx::query(
            r#"UPDATE sites SET theme = ?, release_status = ?, current_published_snapshot_id = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(after.data.theme.key())
        .bind(after.release_status.key())
        .bind(after.current_published_snapshot_id.map(|id| id.to_string()))
        .bind(format_datetime(&Utc::now()))
        .bind(entry.site_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;
        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        write_pages(&mut tx, &entry.site_id, &after.data).await?;

        if let Some(snapshot) = snapshot {
            sqlx::query(
                "INSERT INTO snapshots (id, site_id, state, label, data, created_at) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(snapshot.id.to_string())
            .bind(snapshot.site_id.to_string())
            .bind(snapshot.state.key())
            .bind(&snapshot.label)
            .bind(to_json("data", &snapshot.data)?)
            .bind(format_datetime(&snapshot.created_at))
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }

        sqlx::query(
            r#"INSERT INTO mutation_log (id, site_id, tool, arguments, before, after, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(entry.id.to_string())
        .bind(entry.site_id.to_string())
        .bind(&entry.tool)
        .bind(to_json("arguments", &entry.arguments)?)
        .bind(to_json("before", &entry.before)?)
        .bind(to_json("after", &entry.after)?)
        .bind(format_datetime(&entry.created_at))
        .execute(&mut *tx)
        .await
        .map_err(query_err)?;

        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn get_snapshot(&self, id: &Uuid) -> Result<Option<Snapshot>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM snapshots WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;
        row.map(|r| SnapshotRow::from_row(&r).map_err(query_err)?.into_snapshot())
            .transpose()
    }

    async fn list_snapshots(&self, site_id: &SiteId) -> Result<Vec<Snapshot>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM snapshots WHERE site_id = ? ORDER BY created_at DESC, id DESC")
            .bind(site_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;
        rows.iter()
            .map(|r| SnapshotRow::from_row(r).map_err(query_err)?.into_snapshot())
            .collect()
    }

    async fn list_mutations(&self, site_id: &SiteId, limit: u32) -> Result<Vec<MutationLogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM mutation_log WHERE site_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(site_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;
        rows.iter()
            .map(|r| MutationRow::from_row(r).map_err(query_err)?.into_entry())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitepilot_types::site::{PageKind, ReleaseStatus, SectionType, ThemePreset};
    use sitepilot_types::snapshot::{SiteCapture, SnapshotState};

    use crate::sqlite::test_pool;

    fn site(theme: ThemePreset) -> Site {
        let now = Utc::now();
        Site {
            id: SiteId::new(),
            conversation_id: ConversationId::new(),
            owner_user_id: Some("user-1".to_string()),
            name: "Studio Books".to_string(),
            theme,
            release_status: ReleaseStatus::Draft,
            current_published_snapshot_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn section(section_type: SectionType, position: u32, content: Option<serde_json::Value>) -> Section {
        Section {
            id: Uuid::now_v7(),
            section_type,
            position,
            variant: "default".to_string(),
            content,
        }
    }

    fn two_pages(theme: ThemePreset) -> SiteData {
        SiteData {
            theme,
            pages: vec![
                Page {
                    kind: PageKind::Home,
                    goal: "Book calls".to_string(),
                    position: 0,
                    sections: vec![
                        section(SectionType::HeroSplit, 0, Some(json!({"headline": "Calm books"}))),
                        section(SectionType::CtaPrimary, 1, None),
                    ],
                },
                Page {
                    kind: PageKind::Contact,
                    goal: "Get in touch".to_string(),
                    position: 1,
                    sections: vec![section(SectionType::Contact, 0, None)],
                },
            ],
        }
    }

    fn capture(data: SiteData, snapshot: Option<Uuid>) -> SiteCapture {
        SiteCapture {
            release_status: if snapshot.is_some() { ReleaseStatus::Published } else { ReleaseStatus::Draft },
            current_published_snapshot_id: snapshot,
            data,
        }
    }

    #[tokio::test]
    async fn test_create_and_load_empty_site() {
        let repo = SqliteSiteRepository::new(test_pool().await);
        let site = site(ThemePreset::Calm);
        repo.create_site(&site, &SiteData::empty(ThemePreset::Calm)).await.unwrap();

        let loaded = repo.get_site(&site.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Studio Books");
        assert_eq!(loaded.owner_user_id.as_deref(), Some("user-1"));
        assert_eq!(repo.load_data(&site.id).await.unwrap(), Some(SiteData::empty(ThemePreset::Calm)));
        assert_eq!(
            repo.site_for_conversation(&site.conversation_id).await.unwrap().map(|s| s.id),
            Some(site.id)
        );
        assert!(repo.load_data(&SiteId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_site_for_conversation_conflicts() {
        let repo = SqliteSiteRepository::new(test_pool().await);
        let first = site(ThemePreset::Calm);
        repo.create_site(&first, &SiteData::empty(ThemePreset::Calm)).await.unwrap();
        let mut second = site(ThemePreset::Bold);
        second.conversation_id = first.conversation_id;
        let err = repo.create_site(&second, &SiteData::empty(ThemePreset::Bold)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_commit_replaces_data_and_appends_log() {
        let repo = SqliteSiteRepository::new(test_pool().await);
        let site = site(ThemePreset::Modern);
        let empty = SiteData::empty(ThemePreset::Modern);
        repo.create_site(&site, &empty).await.unwrap();

        let data = two_pages(ThemePreset::Bold);
        let snapshot = Snapshot {
            id: Uuid::now_v7(),
            site_id: site.id,
            state: SnapshotState::Published,
            label: "Launch".to_string(),
            data: data.clone(),
            created_at: Utc::now(),
        };
        let entry = MutationLogEntry {
            id: Uuid::now_v7(),
            site_id: site.id,
            tool: "publishSnapshot".to_string(),
            arguments: json!({"snapshotId": snapshot.id}),
            before: capture(empty, None),
            after: capture(data.clone(), Some(snapshot.id)),
            created_at: Utc::now(),
        };
        repo.commit(&entry, Some(&snapshot)).await.unwrap();

        assert_eq!(repo.load_data(&site.id).await.unwrap(), Some(data));
        let loaded = repo.get_site(&site.id).await.unwrap().unwrap();
        assert_eq!(loaded.theme, ThemePreset::Bold);
        assert_eq!(loaded.release_status, ReleaseStatus::Published);
        assert_eq!(loaded.current_published_snapshot_id, Some(snapshot.id));
        assert_eq!(repo.get_snapshot(&snapshot.id).await.unwrap(), Some(snapshot));

        let log = repo.list_mutations(&site.id, 10).await.unwrap();
        assert_eq!(log, vec![entry]);
    }

    #[tokio::test]
    async fn test_failed_commit_writes_nothing() {
        let repo = SqliteSiteRepository::new(test_pool().await);
        let site = site(ThemePreset::Classic);
        let empty = SiteData::empty(ThemePreset::Classic);
        repo.create_site(&site, &empty).await.unwrap();

        let entry = MutationLogEntry {
            id: Uuid::now_v7(),
            site_id: site.id,
            tool: "createSiteFromPlan".to_string(),
            arguments: json!({}),
            before: capture(empty.clone(), None),
            after: capture(two_pages(ThemePreset::Classic), None),
            created_at: Utc::now(),
        };
        repo.commit(&entry, None).await.unwrap();

        // Reusing the entry id violates the log's primary key after the
        // pages were rewritten; the whole unit must roll back.
        let mut retry = entry.clone();
        retry.after = capture(empty, None);
        assert!(repo.commit(&retry, None).await.is_err());
        assert_eq!(repo.load_data(&site.id).await.unwrap(), Some(entry.after.data.clone()));
        assert_eq!(repo.list_mutations(&site.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshots_newest_first() {
        let repo = SqliteSiteRepository::new(test_pool().await);
        let site = site(ThemePreset::Classic);
        let empty = SiteData::empty(ThemePreset::Classic);
        repo.create_site(&site, &empty).await.unwrap();

        let mut ids = Vec::new();
        for label in ["first", "second"] {
            let snapshot = Snapshot {
                id: Uuid::now_v7(),
                site_id: site.id,
                state: SnapshotState::Preview,
                label: label.to_string(),
                data: empty.clone(),
                created_at: Utc::now(),
            };
            let entry = MutationLogEntry {
                id: Uuid::now_v7(),
                site_id: site.id,
                tool: "createPreview".to_string(),
                arguments: json!({"label": label}),
                before: capture(empty.clone(), None),
                after: capture(empty.clone(), None),
                created_at: Utc::now(),
            };
            repo.commit(&entry, Some(&snapshot)).await.unwrap();
            ids.push(snapshot.id);
        }

        let listed: Vec<Uuid> = repo.list_snapshots(&site.id).await.unwrap().iter().map(|s| s.id).collect();
        assert_eq!(listed, vec![ids[1], ids[0]]);
    }
}
