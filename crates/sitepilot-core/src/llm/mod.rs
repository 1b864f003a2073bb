//! LLM provider abstractions for SitePilot.
//!
//! - `LlmProvider`: RPITIT trait for concrete provider implementations
//! - `BoxLlmProvider`: Object-safe wrapper for dynamic dispatch
//! - `GenerativeService`: JSON-producing calls with retries and schema-driven regeneration

pub mod box_provider;
pub mod generative;
pub mod provider;
