//! `sitepilot key`: issue an API key for the HTTP endpoint.

use anyhow::Result;
use console::style;

use sitepilot_infra::sqlite::api_key::SqliteApiKeyStore;

use crate::state::Storage;

/// Create a key bound to `user_id`. The plaintext is shown once; only its
/// hash is stored.
pub async fn create_key(storage: &Storage, name: &str, user_id: &str, json: bool) -> Result<()> {
    let name = name.trim();
    let user_id = user_id.trim();
    if name.is_empty() || user_id.is_empty() {
        anyhow::bail!("key name and user must not be empty");
    }

    let store = SqliteApiKeyStore::new(storage.db_pool.clone());
    let key = store.create_key(name, user_id).await?;
    tracing::info!(name, user_id, "API key created");

    if json {
        let out = serde_json::json!({ "name": name, "userId": user_id, "key": key });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} API key '{}' for {} (save this, it won't be shown again):",
        style("🔑").bold(),
        style(name).cyan(),
        style(user_id).cyan()
    );
    println!();
    println!("  {}", style(&key).yellow().bold());
    println!();
    println!(
        "  {}",
        style("Send it as 'Authorization: Bearer <key>' or 'X-API-Key: <key>'.").dim()
    );
    println!();
    Ok(())
}
