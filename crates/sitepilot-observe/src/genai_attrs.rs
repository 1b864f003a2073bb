//! OpenTelemetry GenAI semantic convention attribute names.
//!
//! Tracing field names must be literals, so the generative spans spell the
//! `gen_ai.*` keys out directly. Only the keys set on the OTel resource live
//! here.

/// The name of the GenAI provider (e.g., "anthropic").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

/// Anthropic provider identifier.
pub const PROVIDER_ANTHROPIC: &str = "anthropic";
