//! Gate evaluation. Gates never fail a turn; a failed gate becomes the
//! clarifying prompt for that turn instead of the requested intent.

use super::intent::IntentTag;
use super::state::TurnState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateFailure {
    IntakeIncomplete,
    IntentUnlocked,
    VoiceIncomplete,
    NoPlan,
}

/// Check the gates for `tag` in their fixed order: intake, design intent,
/// voice (content only), then an applied site plan.
pub fn check_gates(tag: IntentTag, state: &TurnState) -> Option<GateFailure> {
    if !state.intake.is_complete() {
        return Some(GateFailure::IntakeIncomplete);
    }
    if !state.intent.as_ref().is_some_and(|s| s.locked) {
        return Some(GateFailure::IntentUnlocked);
    }
    if tag == IntentTag::ContentEdit && !state.voice.is_complete() {
        return Some(GateFailure::VoiceIncomplete);
    }
    let needs_plan = !matches!(
        tag,
        IntentTag::Build | IntentTag::AdvisoryMode | IntentTag::Explain
    );
    if needs_plan && !state.plan.as_ref().is_some_and(|p| p.is_applied()) {
        return Some(GateFailure::NoPlan);
    }
    None
}
