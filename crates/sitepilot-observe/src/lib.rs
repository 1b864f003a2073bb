//! Tracing and OpenTelemetry setup for SitePilot.

pub mod genai_attrs;
pub mod tracing_setup;
