//! Configuration loading and data directory resolution.
//!
//! Reads `config.toml` from the data directory (`~/.sitepilot/` by default)
//! into [`SitePilotConfig`]. A missing or malformed file falls back to the
//! defaults.

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use sitepilot_types::config::SitePilotConfig;

use crate::llm::API_KEY_ENV;

pub const DATA_DIR_ENV: &str = "SITEPILOT_DATA_DIR";

/// Load `{data_dir}/config.toml`, or the defaults when it is missing or invalid.
pub async fn load_config(data_dir: &Path) -> SitePilotConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return SitePilotConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return SitePilotConfig::default();
        }
    };

    match toml::from_str::<SitePilotConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", config_path.display());
            SitePilotConfig::default()
        }
    }
}

/// Resolve the data directory.
///
/// Priority: `SITEPILOT_DATA_DIR`, then `~/.sitepilot`, then `./.sitepilot`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok(), dirs::home_dir())
}

fn data_dir_from(env: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    match home {
        Some(home) => home.join(".sitepilot"),
        None => PathBuf::from(".sitepilot"),
    }
}

/// The provider key from `ANTHROPIC_API_KEY`, if set and non-empty.
pub fn api_key_from_env() -> Option<SecretString> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config, SitePilotConfig::default());
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
model = "claude-haiku-3-5"
history_limit = 20

[generation]
max_regenerations = 1

[recommendation]
score_threshold = 2.5
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.model, "claude-haiku-3-5");
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.generation.max_regenerations, 1);
        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.recommendation.score_threshold, 2.5);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config, SitePilotConfig::default());
    }

    #[test]
    fn data_dir_priority() {
        let home = Some(PathBuf::from("/home/owner"));
        assert_eq!(
            data_dir_from(Some("/srv/sitepilot".to_string()), home.clone()),
            PathBuf::from("/srv/sitepilot")
        );
        assert_eq!(data_dir_from(Some("  ".to_string()), home.clone()), PathBuf::from("/home/owner/.sitepilot"));
        assert_eq!(data_dir_from(None, home), PathBuf::from("/home/owner/.sitepilot"));
        assert_eq!(data_dir_from(None, None), PathBuf::from(".sitepilot"));
    }
}
