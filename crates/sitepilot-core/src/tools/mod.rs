//! Mutation tools.
//!
//! Every tool run follows the same discipline:
//! 1. Load the site and capture its state (the before side)
//! 2. Re-validate the arguments and apply them to a copy
//! 3. Commit the after side, any new snapshot and one mutation-log entry as
//!    a single atomic unit
//!
//! Validation and precondition failures return before anything is written.

mod content;
mod presentation;
mod release;
pub(crate) mod structure;

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use sitepilot_types::contract::IntakeContract;
use sitepilot_types::conversation::ConversationId;
use sitepilot_types::draft::ToolCall;
use sitepilot_types::error::ToolError;
use sitepilot_types::site::{ReleaseStatus, Site, SiteData, SiteId, ThemePreset};
use sitepilot_types::snapshot::{MutationLogEntry, SiteCapture, Snapshot};

use crate::repository::site::SiteRepository;

/// Per-call facts a tool needs besides its arguments.
#[derive(Debug, Clone, Copy)]
pub struct ToolContext<'a> {
    /// Verified user id, `None` for anonymous requests.
    pub user_id: Option<&'a str>,
    pub intake: &'a IntakeContract,
}

/// Result of one committed tool run.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub entry: MutationLogEntry,
    pub snapshot: Option<Snapshot>,
    pub summary: String,
}

impl ToolOutcome {
    /// Whether the run changed the site.
    pub fn changed(&self) -> bool {
        self.entry.before != self.entry.after || self.snapshot.is_some()
    }
}

/// Runs tool calls against a [`SiteRepository`].
pub struct ToolExecutor<S: SiteRepository> {
    sites: Arc<S>,
}

impl<S: SiteRepository> ToolExecutor<S> {
    pub fn new(sites: Arc<S>) -> Self {
        Self { sites }
    }

    /// Create the site record when the design intent is locked.
    pub async fn create_site(
        &self,
        conversation_id: ConversationId,
        owner_user_id: Option<&str>,
        name: &str,
        theme: ThemePreset,
    ) -> Result<Site, ToolError> {
        let now = Utc::now();
        let site = Site {
            id: SiteId::new(),
            conversation_id,
            owner_user_id: owner_user_id.map(str::to_string),
            name: name.trim().to_string(),
            theme,
            release_status: ReleaseStatus::Draft,
            current_published_snapshot_id: None,
            created_at: now,
            updated_at: now,
        };
        self.sites.create_site(&site, &SiteData::empty(theme)).await?;
        info!(site_id = %site.id, %theme, "Site created");
        Ok(site)
    }

    /// Validate and apply one tool call, committing exactly one log entry.
    pub async fn execute(
        &self,
        site_id: &SiteId,
        call: &ToolCall,
        ctx: ToolContext<'_>,
    ) -> Result<ToolOutcome, ToolError> {
        let tool = call.name();
        let result = self.run(site_id, call, ctx).await;
        match &result {
            Ok(outcome) => info!(
                tool,
                %site_id,
                changed = outcome.changed(),
                mutation_id = %outcome.entry.id,
                "Tool applied"
            ),
            Err(e) => warn!(tool, %site_id, error = %e, "Tool rejected"),
        }
        result
    }

    async fn run(
        &self,
        site_id: &SiteId,
        call: &ToolCall,
        ctx: ToolContext<'_>,
    ) -> Result<ToolOutcome, ToolError> {
        let not_found = || ToolError::NotFound {
            entity: "site",
            id: site_id.to_string(),
        };
        let site = self.sites.get_site(site_id).await?.ok_or_else(not_found)?;
        let data = self.sites.load_data(site_id).await?.ok_or_else(not_found)?;

        let before = SiteCapture {
            release_status: site.release_status,
            current_published_snapshot_id: site.current_published_snapshot_id,
            data,
        };
        let mut after = before.clone();

        let (snapshot, summary) = match call {
            ToolCall::Structure(t) => (None, structure::apply(&mut after.data, t, ctx.intake)?),
            ToolCall::Content(t) => (None, content::apply(&mut after.data, t)?),
            ToolCall::Presentation(t) => (None, presentation::apply(&mut after.data, t)?),
            ToolCall::Release(t) => {
                release::authorize(&site, ctx.user_id)?;
                release::apply(self.sites.as_ref(), &site, &mut after, t).await?
            }
        };
        after.data.normalize();

        let entry = MutationLogEntry {
            id: Uuid::now_v7(),
            site_id: *site_id,
            tool: call.name().to_string(),
            arguments: call.arguments(),
            before,
            after,
            created_at: Utc::now(),
        };
        self.sites.commit(&entry, snapshot.as_ref()).await?;

        Ok(ToolOutcome {
            entry,
            snapshot,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitepilot_types::contract::BlogPresence;
    use sitepilot_types::draft::{ContentTool, ReleaseTool, StructureTool};
    use sitepilot_types::plan::{PagePlan, SitePlan};
    use sitepilot_types::site::{PageKind, SectionType};
    use sitepilot_types::snapshot::SnapshotState;

    use crate::testing::InMemorySiteRepository;

    fn intake() -> IntakeContract {
        IntakeContract {
            purpose: Some("bookkeeping".to_string()),
            audience: Some("studios".to_string()),
            action: Some("book a call".to_string()),
            tone: Some("calm".to_string()),
            blog_presence: Some(BlogPresence::No),
        }
    }

    fn plan() -> SitePlan {
        let mut plan = SitePlan::default();
        plan.pages.insert(
            PageKind::Home,
            PagePlan {
                goal: "Explain the offer".to_string(),
                ordered_sections: vec![SectionType::HeroSplit, SectionType::Testimonials, SectionType::CtaPrimary],
            },
        );
        plan
    }

    async fn setup(owner: Option<&str>) -> (ToolExecutor<InMemorySiteRepository>, Arc<InMemorySiteRepository>, SiteId) {
        let repo = Arc::new(InMemorySiteRepository::default());
        let executor = ToolExecutor::new(repo.clone());
        let site = executor
            .create_site(ConversationId::new(), owner, "Ledger Studio", ThemePreset::Calm)
            .await
            .unwrap();
        let ctx = ToolContext {
            user_id: owner,
            intake: &intake(),
        };
        executor
            .execute(&site.id, &StructureTool::CreateSiteFromPlan { plan: plan() }.into(), ctx)
            .await
            .unwrap();
        (executor, repo, site.id)
    }

    #[tokio::test]
    async fn test_execute_logs_before_and_after() {
        let (_, repo, site_id) = setup(None).await;
        let log = repo.list_mutations(&site_id, 10).await.unwrap();
        assert_eq!(log.len(), 1);
        let entry = &log[0];
        assert_eq!(entry.tool, "createSiteFromPlan");
        assert!(entry.before.data.pages.is_empty());
        assert_eq!(entry.after.data.pages.len(), 1);
        assert_eq!(repo.load_data(&site_id).await.unwrap().unwrap(), entry.after.data);
    }

    #[tokio::test]
    async fn test_rejected_call_writes_nothing() {
        let (executor, repo, site_id) = setup(None).await;
        let intake = intake();
        let ctx = ToolContext {
            user_id: None,
            intake: &intake,
        };
        let call = ToolCall::from(StructureTool::EnableBlog);
        assert!(matches!(
            executor.execute(&site_id, &call, ctx).await,
            Err(ToolError::Precondition(_))
        ));

        let data = repo.load_data(&site_id).await.unwrap().unwrap();
        let hero = data.pages[0].sections[0].id;
        let bad_copy = ToolCall::from(ContentTool::GenerateSectionContent {
            section_id: hero,
            content: json!({"headline": "<b>Hi</b>", "subheadline": "x", "primaryCtaLabel": "Go"}),
        });
        assert!(matches!(
            executor.execute(&site_id, &bad_copy, ctx).await,
            Err(ToolError::Schema(_))
        ));
        assert_eq!(repo.list_mutations(&site_id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_release_requires_verified_owner() {
        let (executor, repo, site_id) = setup(Some("user-1")).await;
        let intake = intake();
        let preview = ToolCall::from(ReleaseTool::CreatePreview {
            label: "First look".to_string(),
        });

        let anonymous = ToolContext {
            user_id: None,
            intake: &intake,
        };
        assert!(matches!(
            executor.execute(&site_id, &preview, anonymous).await,
            Err(ToolError::Unauthorized(_))
        ));
        let stranger = ToolContext {
            user_id: Some("user-2"),
            intake: &intake,
        };
        assert!(matches!(
            executor.execute(&site_id, &preview, stranger).await,
            Err(ToolError::Unauthorized(_))
        ));
        assert_eq!(repo.list_mutations(&site_id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_preview_publish_rollback_cycle() {
        let (executor, repo, site_id) = setup(Some("owner")).await;
        let intake = intake();
        let ctx = ToolContext {
            user_id: Some("owner"),
            intake: &intake,
        };

        // Publishing needs a preview first.
        let first_preview = executor
            .execute(&site_id, &ReleaseTool::CreatePreview { label: "v1".to_string() }.into(), ctx)
            .await
            .unwrap()
            .snapshot
            .unwrap();
        assert_eq!(first_preview.state, SnapshotState::Preview);
        let site = repo.get_site(&site_id).await.unwrap().unwrap();
        assert_eq!(site.release_status, ReleaseStatus::Preview);

        let v1 = executor
            .execute(
                &site_id,
                &ReleaseTool::PublishSnapshot { snapshot_id: first_preview.id }.into(),
                ctx,
            )
            .await
            .unwrap()
            .snapshot
            .unwrap();
        assert_eq!(v1.state, SnapshotState::Published);
        let site = repo.get_site(&site_id).await.unwrap().unwrap();
        assert_eq!(site.current_published_snapshot_id, Some(v1.id));
        assert_eq!(site.release_status, ReleaseStatus::Published);

        // Rolling back onto the live snapshot is refused without a log entry.
        let before = repo.list_mutations(&site_id, 50).await.unwrap().len();
        let err = executor
            .execute(&site_id, &ReleaseTool::RollbackToSnapshot { snapshot_id: v1.id }.into(), ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already live"));
        assert_eq!(repo.list_mutations(&site_id, 50).await.unwrap().len(), before);

        // Change the site, publish v2, then roll back to v1.
        executor
            .execute(
                &site_id,
                &StructureTool::AddSection {
                    page: PageKind::Home,
                    section_type: SectionType::Faq,
                    position: None,
                }
                .into(),
                ctx,
            )
            .await
            .unwrap();
        let second_preview = executor
            .execute(&site_id, &ReleaseTool::CreatePreview { label: "v2".to_string() }.into(), ctx)
            .await
            .unwrap()
            .snapshot
            .unwrap();
        let v2 = executor
            .execute(
                &site_id,
                &ReleaseTool::PublishSnapshot { snapshot_id: second_preview.id }.into(),
                ctx,
            )
            .await
            .unwrap()
            .snapshot
            .unwrap();

        // Previews cannot be rollback targets.
        assert!(matches!(
            executor
                .execute(
                    &site_id,
                    &ReleaseTool::RollbackToSnapshot { snapshot_id: first_preview.id }.into(),
                    ctx
                )
                .await,
            Err(ToolError::Precondition(_))
        ));

        executor
            .execute(&site_id, &ReleaseTool::RollbackToSnapshot { snapshot_id: v1.id }.into(), ctx)
            .await
            .unwrap();
        let site = repo.get_site(&site_id).await.unwrap().unwrap();
        assert_eq!(site.current_published_snapshot_id, Some(v1.id));
        let data = repo.load_data(&site_id).await.unwrap().unwrap();
        assert!(!data.pages[0].has_section(SectionType::Faq));
        assert_ne!(v1.id, v2.id);
    }

    #[tokio::test]
    async fn test_duplicate_preview_is_not_recreated() {
        let (executor, repo, site_id) = setup(Some("owner")).await;
        let intake = intake();
        let ctx = ToolContext {
            user_id: Some("owner"),
            intake: &intake,
        };
        let call = ToolCall::from(ReleaseTool::CreatePreview {
            label: "v1".to_string(),
        });
        assert!(executor.execute(&site_id, &call, ctx).await.unwrap().snapshot.is_some());
        let again = executor.execute(&site_id, &call, ctx).await.unwrap();
        assert!(again.snapshot.is_none());
        assert!(!again.changed());
        assert_eq!(repo.list_snapshots(&site_id).await.unwrap().len(), 1);
    }
}
