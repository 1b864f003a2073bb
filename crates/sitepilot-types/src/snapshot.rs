use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::site::{ReleaseStatus, SiteData, SiteId};

keyed_enum! {
    pub enum SnapshotState {
        Preview => "preview",
        Published => "published",
    }
}

/// An immutable capture of full site state, used for previews and rollback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: Uuid,
    pub site_id: SiteId,
    pub state: SnapshotState,
    pub label: String,
    pub data: SiteData,
    pub created_at: DateTime<Utc>,
}

/// Site state as seen by the mutation log on either side of a tool run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteCapture {
    pub release_status: ReleaseStatus,
    pub current_published_snapshot_id: Option<Uuid>,
    pub data: SiteData,
}

/// One append-only audit trail entry. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationLogEntry {
    pub id: Uuid,
    pub site_id: SiteId,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub before: SiteCapture,
    pub after: SiteCapture,
    pub created_at: DateTime<Utc>,
}
