//! Site repository trait definition.

use sitepilot_types::error::RepositoryError;
use sitepilot_types::site::{Site, SiteData, SiteId};
use sitepilot_types::snapshot::{MutationLogEntry, Snapshot};
use uuid::Uuid;

/// Repository trait for sites, their pages/sections, snapshots, and the
/// mutation log.
///
/// Implementations live in sitepilot-infra (e.g., SqliteSiteRepository).
pub trait SiteRepository: Send + Sync {
    /// Create a site with its initial data.
    fn create_site(
        &self,
        site: &Site,
        data: &SiteData,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_site(
        &self,
        id: &SiteId,
    ) -> impl std::future::Future<Output = Result<Option<Site>, RepositoryError>> + Send;

    /// Theme, pages and sections of a site.
    fn load_data(
        &self,
        id: &SiteId,
    ) -> impl std::future::Future<Output = Result<Option<SiteData>, RepositoryError>> + Send;

    /// Apply one tool run as a single atomic unit.
    ///
    /// Replaces the site's data, release status and published pointer with
    /// `entry.after`, inserts `snapshot` when present, and appends `entry`
    /// to the mutation log. Either all of it is written or none of it.
    fn commit(
        &self,
        entry: &MutationLogEntry,
        snapshot: Option<&Snapshot>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    fn get_snapshot(
        &self,
        id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Snapshot>, RepositoryError>> + Send;

    /// Snapshots of a site, newest first.
    fn list_snapshots(
        &self,
        site_id: &SiteId,
    ) -> impl std::future::Future<Output = Result<Vec<Snapshot>, RepositoryError>> + Send;

    /// Mutation log of a site, newest first.
    fn list_mutations(
        &self,
        site_id: &SiteId,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<MutationLogEntry>, RepositoryError>> + Send;
}
