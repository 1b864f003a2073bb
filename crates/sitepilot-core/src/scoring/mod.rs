//! Recommendation scoring and eligibility.

pub mod candidates;
pub mod engine;

pub use candidates::Candidate;
pub use engine::{RecommendationEngine, key_history, weighted_score};
