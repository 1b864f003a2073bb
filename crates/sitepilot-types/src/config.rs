//! Global configuration types for SitePilot.
//!
//! `SitePilotConfig` represents the top-level `config.toml` that controls the
//! generative model, regeneration limits, and recommendation tuning.

use serde::{Deserialize, Serialize};

use crate::contract::AudienceLevel;

/// Top-level configuration. Loaded from `{data_dir}/config.toml`; every field
/// has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitePilotConfig {
    /// Model identifier sent to the generative provider.
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Number of recent messages loaded per turn.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub recommendation: RecommendationConfig,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_temperature() -> f64 {
    0.4
}

fn default_history_limit() -> u32 {
    12
}

impl Default for SitePilotConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            history_limit: default_history_limit(),
            generation: GenerationConfig::default(),
            recommendation: RecommendationConfig::default(),
        }
    }
}

/// Limits on generative calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Silent regenerations with a corrective instruction after a schema violation.
    #[serde(default = "default_max_regenerations")]
    pub max_regenerations: u32,

    /// Transport attempts per generative call.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_regenerations() -> u32 {
    2
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_regenerations: default_max_regenerations(),
            max_attempts: default_max_attempts(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Recommendation ranking constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    /// Minimum weighted score for a candidate to be surfaced.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f64,

    #[serde(default = "default_cap_general")]
    pub cap_general: usize,

    /// Cap used for the `informed` audience and when no voice is set.
    #[serde(default = "default_cap_default")]
    pub cap_default: usize,

    #[serde(default = "default_cap_expert")]
    pub cap_expert: usize,

    /// A key deferred this many times is no longer proposed.
    #[serde(default = "default_max_deferrals")]
    pub max_deferrals: u32,
}

fn default_score_threshold() -> f64 {
    3.0
}

fn default_cap_general() -> usize {
    1
}

fn default_cap_default() -> usize {
    2
}

fn default_cap_expert() -> usize {
    3
}

fn default_max_deferrals() -> u32 {
    2
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            cap_general: default_cap_general(),
            cap_default: default_cap_default(),
            cap_expert: default_cap_expert(),
            max_deferrals: default_max_deferrals(),
        }
    }
}

impl RecommendationConfig {
    /// How many actionable recommendations to surface for an audience.
    pub fn cap_for(&self, audience: Option<AudienceLevel>) -> usize {
        match audience {
            Some(AudienceLevel::General) => self.cap_general,
            Some(AudienceLevel::Expert) => self.cap_expert,
            Some(AudienceLevel::Informed) | None => self.cap_default,
        }
    }
}
