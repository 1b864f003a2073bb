//! Conversational turn handling.
//!
//! A turn resolves any pending draft first, then fills the gating contracts
//! (intake, design intent, voice), then classifies the message into an intent
//! and dispatches it. Every site change goes through a staged draft and an
//! explicit confirmation.

pub mod engine;
pub mod gates;
pub mod intent;
pub mod prompts;
pub mod proposal;
pub mod reply;
pub mod state;
pub mod stream;

pub use engine::{TurnInput, TurnOrchestrator};
pub use intent::{Classification, IntentClassifier, IntentTag, RegexIntentClassifier};
pub use stream::FieldPatchExtractor;
