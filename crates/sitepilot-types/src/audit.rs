use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::site::SiteId;

keyed_enum! {
    /// Finding severity. Orders low < medium < high.
    pub enum Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

keyed_enum! {
    /// The six audit rule sets.
    pub enum AuditArea {
        Structure => "structure",
        Content => "content",
        Voice => "voice",
        Presentation => "presentation",
        Conversion => "conversion",
        Coherence => "coherence",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditFinding {
    pub severity: Severity,
    pub area: AuditArea,
    pub issue: String,
    pub rationale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// One persisted audit execution. Runs are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRun {
    pub id: Uuid,
    pub site_id: SiteId,
    pub findings: Vec<AuditFinding>,
    pub created_at: DateTime<Utc>,
}

impl AuditRun {
    /// Findings grouped by severity, highest first. Empty groups are omitted.
    pub fn by_severity(&self) -> Vec<(Severity, Vec<&AuditFinding>)> {
        Severity::ALL
            .iter()
            .rev()
            .map(|sev| {
                (
                    *sev,
                    self.findings.iter().filter(|f| f.severity == *sev).collect::<Vec<_>>(),
                )
            })
            .filter(|(_, group)| !group.is_empty())
            .collect()
    }
}
