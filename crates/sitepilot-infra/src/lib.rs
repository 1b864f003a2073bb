//! Infrastructure layer for SitePilot.
//!
//! Implements the repository traits defined in `sitepilot-core` on SQLite,
//! the generative provider on the Anthropic Messages API, and configuration
//! loading.

pub mod config;
pub mod llm;
pub mod sqlite;
