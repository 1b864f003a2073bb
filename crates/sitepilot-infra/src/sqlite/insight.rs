//! SQLite recommendation and audit-run persistence.

use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use sitepilot_core::repository::insight::InsightRepository;
use sitepilot_types::audit::AuditRun;
use sitepilot_types::error::RepositoryError;
use sitepilot_types::recommendation::{RecommendationRecord, RecommendationStatus};
use sitepilot_types::site::SiteId;

use super::pool::DatabasePool;
use super::{format_datetime, from_json, parse_datetime, parse_key, parse_uuid, query_err, to_json};

/// SQLite-backed implementation of `InsightRepository`.
pub struct SqliteInsightRepository {
    pool: DatabasePool,
}

impl SqliteInsightRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct RecommendationRow {
    site_id: String,
    status: String,
    payload: String,
    created_at: String,
    updated_at: String,
}

impl RecommendationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            site_id: row.try_get("site_id")?,
            status: row.try_get("status")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_record(self) -> Result<RecommendationRecord, RepositoryError> {
        Ok(RecommendationRecord {
            site_id: SiteId::from_uuid(parse_uuid(&self.site_id)?),
            recommendation: from_json("payload", &self.payload)?,
            status: parse_key("status", &self.status)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

impl InsightRepository for SqliteInsightRepository {
    async fn save_recommendations(&self, records: &[RecommendationRecord]) -> Result<(), RepositoryError> {
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        for record in records {
            let rec = &record.recommendation;
            sqlx::query(
                r#"INSERT INTO recommendations (id, site_id, recommendation_key, kind, status, payload, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(rec.id.to_string())
            .bind(record.site_id.to_string())
            .bind(&rec.key)
            .bind(rec.recommendation_id.key())
            .bind(record.status.key())
            .bind(to_json("payload", rec)?)
            .bind(format_datetime(&record.created_at))
            .bind(format_datetime(&record.updated_at))
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }
        tx.commit().await.map_err(query_err)?;
        Ok(())
    }

    async fn set_recommendation_status(
        &self,
        recommendation_id: &Uuid,
        status: RecommendationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE recommendations SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.key())
            .bind(format_datetime(&Utc::now()))
            .bind(recommendation_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list_recommendations(&self, site_id: &SiteId) -> Result<Vec<RecommendationRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT site_id, status, payload, created_at, updated_at
               FROM recommendations WHERE site_id = ? ORDER BY created_at, id"#,
        )
        .bind(site_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;
        rows.iter()
            .map(|r| RecommendationRow::from_row(r).map_err(query_err)?.into_record())
            .collect()
    }

    async fn save_audit_run(&self, run: &AuditRun) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO audit_runs (id, site_id, findings, created_at) VALUES (?, ?, ?, ?)")
            .bind(run.id.to_string())
            .bind(run.site_id.to_string())
            .bind(to_json("findings", &run.findings)?)
            .bind(format_datetime(&run.created_at))
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn list_audit_runs(&self, site_id: &SiteId) -> Result<Vec<AuditRun>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, site_id, findings, created_at FROM audit_runs WHERE site_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(site_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id").map_err(query_err)?;
                let site_id: String = row.try_get("site_id").map_err(query_err)?;
                let findings: String = row.try_get("findings").map_err(query_err)?;
                let created_at: String = row.try_get("created_at").map_err(query_err)?;
                Ok(AuditRun {
                    id: parse_uuid(&id)?,
                    site_id: SiteId::from_uuid(parse_uuid(&site_id)?),
                    findings: from_json("findings", &findings)?,
                    created_at: parse_datetime(&created_at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_core::repository::site::SiteRepository;
    use sitepilot_types::audit::{AuditArea, AuditFinding, Severity};
    use sitepilot_types::conversation::ConversationId;
    use sitepilot_types::draft::{StructureTool, ToolCall};
    use sitepilot_types::recommendation::{Phase, Recommendation, RecommendationKind, Scores};
    use sitepilot_types::site::{PageKind, ReleaseStatus, SectionType, Site, SiteData, ThemePreset};

    use crate::sqlite::site::SqliteSiteRepository;
    use crate::sqlite::test_pool;

    async fn setup() -> (SqliteInsightRepository, SiteId) {
        let pool = test_pool().await;
        let sites = SqliteSiteRepository::new(pool.clone());
        let now = Utc::now();
        let site = Site {
            id: SiteId::new(),
            conversation_id: ConversationId::new(),
            owner_user_id: None,
            name: "Studio Books".to_string(),
            theme: ThemePreset::Calm,
            release_status: ReleaseStatus::Draft,
            current_published_snapshot_id: None,
            created_at: now,
            updated_at: now,
        };
        sites.create_site(&site, &SiteData::empty(ThemePreset::Calm)).await.unwrap();
        (SqliteInsightRepository::new(pool), site.id)
    }

    fn record(site_id: SiteId) -> RecommendationRecord {
        let now = Utc::now();
        RecommendationRecord {
            site_id,
            recommendation: Recommendation {
                id: Uuid::now_v7(),
                recommendation_id: RecommendationKind::AddFaqSection,
                key: "addFaqSection:home".to_string(),
                phase: Phase::Structure,
                title: "Answer common questions on the home page".to_string(),
                rationale: "A short FAQ removes doubts.".to_string(),
                why_not: vec!["Add a contact page".to_string()],
                scores: Scores {
                    impact: 3.5,
                    alignment: 3.0,
                    confidence: 4.0,
                    disruption: 1.0,
                    score: 3.0,
                },
                action: Some(ToolCall::from(StructureTool::AddSection {
                    page: PageKind::Home,
                    section_type: SectionType::Faq,
                    position: None,
                })),
                focus_section: None,
            },
            status: RecommendationStatus::Proposed,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_recommendation_roundtrip_and_status_update() {
        let (repo, site_id) = setup().await;
        let rec = record(site_id);
        repo.save_recommendations(std::slice::from_ref(&rec)).await.unwrap();

        let listed = repo.list_recommendations(&site_id).await.unwrap();
        assert_eq!(listed, vec![rec.clone()]);

        repo.set_recommendation_status(&rec.recommendation.id, RecommendationStatus::Deferred)
            .await
            .unwrap();
        let listed = repo.list_recommendations(&site_id).await.unwrap();
        assert_eq!(listed[0].status, RecommendationStatus::Deferred);
        assert!(listed[0].updated_at >= rec.updated_at);

        let missing = repo
            .set_recommendation_status(&Uuid::now_v7(), RecommendationStatus::Accepted)
            .await;
        assert!(matches!(missing, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_audit_runs_newest_first() {
        let (repo, site_id) = setup().await;
        let first = AuditRun {
            id: Uuid::now_v7(),
            site_id,
            findings: Vec::new(),
            created_at: Utc::now(),
        };
        let second = AuditRun {
            id: Uuid::now_v7(),
            site_id,
            findings: vec![AuditFinding {
                severity: Severity::High,
                area: AuditArea::Conversion,
                issue: "No primary call to action".to_string(),
                rationale: "Visitors have no next step.".to_string(),
                recommendation: Some("Add a primary call to action".to_string()),
            }],
            created_at: Utc::now(),
        };
        repo.save_audit_run(&first).await.unwrap();
        repo.save_audit_run(&second).await.unwrap();

        let runs = repo.list_audit_runs(&site_id).await.unwrap();
        assert_eq!(runs, vec![second, first]);
    }
}
