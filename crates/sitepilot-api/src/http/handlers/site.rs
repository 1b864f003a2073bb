//! Read endpoints for a site, its snapshots and its mutation log.
//!
//! A site with an owner is only visible to that owner; sites created in an
//! anonymous conversation are visible to anyone holding their id.

use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sitepilot_core::repository::site::SiteRepository;
use sitepilot_types::site::{ReleaseStatus, Site, SiteData, SiteId};
use sitepilot_types::snapshot::{MutationLogEntry, Snapshot, SnapshotState};

use crate::http::error::AppError;
use crate::http::extractors::identity::Identity;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDetail {
    #[serde(flatten)]
    pub site: Site,
    pub data: SiteData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: Uuid,
    pub state: SnapshotState,
    pub label: String,
    pub live: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSummary {
    pub id: Uuid,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub release_before: ReleaseStatus,
    pub release_after: ReleaseStatus,
    pub created_at: DateTime<Utc>,
}

impl SnapshotSummary {
    pub fn new(snapshot: Snapshot, live_id: Option<Uuid>) -> Self {
        Self {
            live: live_id == Some(snapshot.id),
            id: snapshot.id,
            state: snapshot.state,
            label: snapshot.label,
            created_at: snapshot.created_at,
        }
    }
}

impl From<MutationLogEntry> for MutationSummary {
    fn from(entry: MutationLogEntry) -> Self {
        Self {
            id: entry.id,
            tool: entry.tool,
            arguments: entry.arguments,
            release_before: entry.before.release_status,
            release_after: entry.after.release_status,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MutationQuery {
    pub limit: Option<u32>,
}

/// Resolve the site and check the caller may see it.
async fn visible_site(state: &AppState, raw_id: &str, identity: &Identity) -> Result<Site, AppError> {
    let id: SiteId = raw_id
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid site id '{raw_id}'")))?;
    let site = state
        .sites
        .get_site(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("site {id}")))?;
    match (&site.owner_user_id, &identity.0) {
        (Some(owner), Some(caller)) if owner == caller => Ok(site),
        (Some(_), _) => Err(AppError::Unauthorized(
            "This site belongs to another account.".to_string(),
        )),
        (None, _) => Ok(site),
    }
}

/// GET /api/v1/sites/{id}
pub async fn get_site(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<ApiResponse<SiteDetail>, AppError> {
    let site = visible_site(&state, &id, &identity).await?;
    let data = state
        .sites
        .load_data(&site.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("site {}", site.id)))?;
    Ok(ApiResponse::success(SiteDetail { site, data }))
}

/// GET /api/v1/sites/{id}/snapshots
pub async fn list_snapshots(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<ApiResponse<Vec<SnapshotSummary>>, AppError> {
    let site = visible_site(&state, &id, &identity).await?;
    let snapshots = state.sites.list_snapshots(&site.id).await?;
    Ok(ApiResponse::success(
        snapshots
            .into_iter()
            .map(|s| SnapshotSummary::new(s, site.current_published_snapshot_id))
            .collect(),
    ))
}

/// GET /api/v1/sites/{id}/mutations?limit=N
pub async fn list_mutations(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Query(query): Query<MutationQuery>,
) -> Result<ApiResponse<Vec<MutationSummary>>, AppError> {
    let site = visible_site(&state, &id, &identity).await?;
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let entries = state.sites.list_mutations(&site.id, limit).await?;
    Ok(ApiResponse::success(
        entries.into_iter().map(MutationSummary::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_types::site::ThemePreset;

    #[test]
    fn test_snapshot_summary_marks_live_snapshot() {
        let snapshot = Snapshot {
            id: Uuid::now_v7(),
            site_id: SiteId::new(),
            state: SnapshotState::Published,
            label: "First publish".to_string(),
            data: SiteData::empty(ThemePreset::Calm),
            created_at: Utc::now(),
        };
        let live = snapshot.id;
        assert!(SnapshotSummary::new(snapshot.clone(), Some(live)).live);
        assert!(!SnapshotSummary::new(snapshot, None).live);
    }
}
