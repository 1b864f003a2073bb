//! Business logic and repository trait definitions for SitePilot.
//!
//! This crate defines the "ports" (repository traits, the LLM provider trait)
//! that the infrastructure layer implements, plus every piece of decision
//! logic: validators, contract parsing, scoring, audits, mutation tools and
//! the turn orchestrator. It depends only on `sitepilot-types` -- never on
//! `sitepilot-infra` or any database/IO crate.

pub mod audit;
pub mod contract;
pub mod llm;
pub mod orchestrator;
pub mod repository;
pub mod scoring;
pub mod tools;
pub mod validate;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;
