//! `sitepilot log`: snapshots and recent mutations of one site.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use sitepilot_core::repository::site::SiteRepository;
use sitepilot_infra::sqlite::site::SqliteSiteRepository;
use sitepilot_types::conversation::ConversationId;
use sitepilot_types::site::{ReleaseStatus, Site, SiteId};

use crate::http::handlers::site::{MutationSummary, SnapshotSummary};
use crate::state::Storage;

pub async fn show_log(
    storage: &Storage,
    site_id: Option<SiteId>,
    conversation_id: Option<ConversationId>,
    limit: u32,
    json: bool,
) -> Result<()> {
    let repo = SqliteSiteRepository::new(storage.db_pool.clone());
    let site = find_site(&repo, site_id, conversation_id).await?;

    let snapshots: Vec<SnapshotSummary> = repo
        .list_snapshots(&site.id)
        .await?
        .into_iter()
        .map(|s| SnapshotSummary::new(s, site.current_published_snapshot_id))
        .collect();
    let mutations: Vec<MutationSummary> = repo
        .list_mutations(&site.id, limit.max(1))
        .await?
        .into_iter()
        .map(MutationSummary::from)
        .collect();

    if json {
        let out = serde_json::json!({
            "site": site,
            "snapshots": snapshots,
            "mutations": mutations,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {} {}",
        style("◆").bold(),
        style(&site.name).cyan().bold(),
        release_label(site.release_status)
    );
    println!("  {}", style(format!("{} · theme {}", site.id, site.theme)).dim());
    println!();

    if snapshots.is_empty() {
        println!("  {} No snapshots yet.", style("i").blue().bold());
    } else {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Snapshot").fg(Color::White),
            Cell::new("State").fg(Color::White),
            Cell::new("Label").fg(Color::White),
            Cell::new("Created").fg(Color::White),
        ]);
        for snapshot in &snapshots {
            let full_id = snapshot.id.to_string();
            let id = short_id(&full_id);
            let id_cell = if snapshot.live {
                Cell::new(format!("{id} (live)")).fg(Color::Green)
            } else {
                Cell::new(id)
            };
            table.add_row(vec![
                id_cell,
                Cell::new(snapshot.state.to_string()),
                Cell::new(&snapshot.label),
                Cell::new(snapshot.created_at.format("%Y-%m-%d %H:%M").to_string()),
            ]);
        }
        println!("{table}");
    }
    println!();

    if mutations.is_empty() {
        println!("  {} No mutations logged.", style("i").blue().bold());
    } else {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("When").fg(Color::White),
            Cell::new("Tool").fg(Color::White),
            Cell::new("Release").fg(Color::White),
        ]);
        for entry in &mutations {
            let release = if entry.release_before == entry.release_after {
                entry.release_after.to_string()
            } else {
                format!("{} → {}", entry.release_before, entry.release_after)
            };
            table.add_row(vec![
                Cell::new(entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                Cell::new(&entry.tool).fg(Color::Cyan),
                Cell::new(release),
            ]);
        }
        println!("{table}");
    }
    println!();

    Ok(())
}

async fn find_site(
    repo: &SqliteSiteRepository,
    site_id: Option<SiteId>,
    conversation_id: Option<ConversationId>,
) -> Result<Site> {
    match (site_id, conversation_id) {
        (Some(id), _) => repo
            .get_site(&id)
            .await?
            .with_context(|| format!("Site '{id}' not found")),
        (None, Some(conversation)) => repo
            .site_for_conversation(&conversation)
            .await?
            .with_context(|| format!("Conversation '{conversation}' has no site yet")),
        (None, None) => anyhow::bail!("pass --site or --conversation"),
    }
}

fn release_label(status: ReleaseStatus) -> String {
    let label = format!("[{status}]");
    match status {
        ReleaseStatus::Published => style(label).green().to_string(),
        ReleaseStatus::Preview => style(label).yellow().to_string(),
        ReleaseStatus::Draft => style(label).dim().to_string(),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}
