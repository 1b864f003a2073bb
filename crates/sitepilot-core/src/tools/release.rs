//! Release tools: createPreview, publishSnapshot, rollbackToSnapshot.
//!
//! Release status only moves forward (draft -> preview -> published).
//! Rollback targets a published snapshot that is not already live.

use chrono::Utc;
use uuid::Uuid;

use sitepilot_types::draft::ReleaseTool;
use sitepilot_types::error::ToolError;
use sitepilot_types::site::{ReleaseStatus, Site};
use sitepilot_types::snapshot::{SiteCapture, Snapshot, SnapshotState};

use crate::repository::site::SiteRepository;

/// Only a verified user may release, and only their own site.
pub(super) fn authorize(site: &Site, user_id: Option<&str>) -> Result<(), ToolError> {
    let Some(user) = user_id else {
        return Err(ToolError::Unauthorized(
            "release operations require a verified user".to_string(),
        ));
    };
    match &site.owner_user_id {
        Some(owner) if owner != user => Err(ToolError::Unauthorized(
            "the site belongs to another user".to_string(),
        )),
        _ => Ok(()),
    }
}

async fn site_snapshot<S: SiteRepository>(
    repo: &S,
    site: &Site,
    id: Uuid,
) -> Result<Snapshot, ToolError> {
    match repo.get_snapshot(&id).await? {
        Some(snapshot) if snapshot.site_id == site.id => Ok(snapshot),
        _ => Err(ToolError::NotFound {
            entity: "snapshot",
            id: id.to_string(),
        }),
    }
}

fn new_snapshot(site: &Site, state: SnapshotState, label: &str, capture: &SiteCapture) -> Snapshot {
    Snapshot {
        id: Uuid::now_v7(),
        site_id: site.id,
        state,
        label: label.to_string(),
        data: capture.data.clone(),
        created_at: Utc::now(),
    }
}

/// Apply a release tool to `state`. Returns the snapshot to insert, if any,
/// and a summary.
pub(super) async fn apply<S: SiteRepository>(
    repo: &S,
    site: &Site,
    state: &mut SiteCapture,
    tool: &ReleaseTool,
) -> Result<(Option<Snapshot>, String), ToolError> {
    match tool {
        ReleaseTool::CreatePreview { label } => {
            let label = label.trim();
            if label.is_empty() {
                return Err(ToolError::Schema(vec!["label: must not be empty".to_string()]));
            }
            if state.data.pages.is_empty() {
                return Err(ToolError::Precondition(
                    "the site has no pages to preview".to_string(),
                ));
            }
            let existing = repo.list_snapshots(&site.id).await?;
            if let Some(same) = existing.iter().find(|s| {
                s.state == SnapshotState::Preview && s.label == label && s.data == state.data
            }) {
                return Ok((None, format!("Preview '{label}' already exists ({})", same.id)));
            }

            let snapshot = new_snapshot(site, SnapshotState::Preview, label, state);
            state.release_status = state.release_status.max(ReleaseStatus::Preview);
            let summary = format!("Created preview '{label}' ({})", snapshot.id);
            Ok((Some(snapshot), summary))
        }

        ReleaseTool::PublishSnapshot { snapshot_id } => {
            let preview = site_snapshot(repo, site, *snapshot_id).await?;
            if preview.state != SnapshotState::Preview {
                return Err(ToolError::Precondition(
                    "only preview snapshots can be published".to_string(),
                ));
            }
            if let Some(current_id) = state.current_published_snapshot_id {
                let current = site_snapshot(repo, site, current_id).await?;
                if current.label == preview.label && current.data == preview.data {
                    return Ok((None, format!("Preview '{}' is already live", preview.label)));
                }
            }

            let published = Snapshot {
                id: Uuid::now_v7(),
                site_id: site.id,
                state: SnapshotState::Published,
                label: preview.label.clone(),
                data: preview.data.clone(),
                created_at: Utc::now(),
            };
            state.current_published_snapshot_id = Some(published.id);
            state.release_status = ReleaseStatus::Published;
            let summary = format!("Published '{}' ({})", published.label, published.id);
            Ok((Some(published), summary))
        }

        ReleaseTool::RollbackToSnapshot { snapshot_id } => {
            let target = site_snapshot(repo, site, *snapshot_id).await?;
            if target.state != SnapshotState::Published {
                return Err(ToolError::Precondition(
                    "can only roll back to a published snapshot".to_string(),
                ));
            }
            if state.current_published_snapshot_id == Some(target.id) {
                return Err(ToolError::Precondition(format!(
                    "snapshot {} is already live",
                    target.id
                )));
            }
            state.data = target.data.clone();
            state.current_published_snapshot_id = Some(target.id);
            state.release_status = ReleaseStatus::Published;
            Ok((None, format!("Rolled back to '{}' ({})", target.label, target.id)))
        }
    }
}
