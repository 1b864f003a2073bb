//! Recommendation history and audit-run persistence.

use sitepilot_types::audit::AuditRun;
use sitepilot_types::error::RepositoryError;
use sitepilot_types::recommendation::{RecommendationRecord, RecommendationStatus};
use sitepilot_types::site::SiteId;
use uuid::Uuid;

/// Repository trait for recommendation records and audit runs.
pub trait InsightRepository: Send + Sync {
    /// Insert newly proposed recommendations.
    fn save_recommendations(
        &self,
        records: &[RecommendationRecord],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Move a recommendation to a new status.
    fn set_recommendation_status(
        &self,
        recommendation_id: &Uuid,
        status: RecommendationStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All recommendation records of a site, oldest first.
    fn list_recommendations(
        &self,
        site_id: &SiteId,
    ) -> impl std::future::Future<Output = Result<Vec<RecommendationRecord>, RepositoryError>> + Send;

    /// Persist a new audit run. Runs are never overwritten.
    fn save_audit_run(
        &self,
        run: &AuditRun,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Audit runs of a site, newest first.
    fn list_audit_runs(
        &self,
        site_id: &SiteId,
    ) -> impl std::future::Future<Output = Result<Vec<AuditRun>, RepositoryError>> + Send;
}
