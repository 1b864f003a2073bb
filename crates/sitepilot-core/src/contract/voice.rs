//! Voice contract questions and answer parsing.

use sitepilot_types::contract::{
    Assertiveness, AudienceLevel, Verbosity, VoiceContract, VoiceField, VoiceTone,
};

use super::{AnswerLine, answer_lines};

fn prompt(field: VoiceField) -> &'static str {
    match field {
        VoiceField::AudienceLevel => "How familiar is your audience with the subject?",
        VoiceField::Tone => "What tone should the copy take?",
        VoiceField::Assertiveness => "How hard should it push?",
        VoiceField::Verbosity => "How much should it say?",
    }
}

/// Numbered voice questions, each with its numbered options.
pub fn voice_questions(missing: &[VoiceField]) -> String {
    let mut text = String::from(
        "Before I write any copy, tell me how it should sound. Answer by number or name, e.g. `1. expert` or `2. 3`:\n",
    );
    for field in missing {
        let options = field
            .options()
            .iter()
            .enumerate()
            .map(|(i, o)| format!("{} {o}", i + 1))
            .collect::<Vec<_>>()
            .join(" / ");
        text.push_str(&format!("{}. {} ({options})\n", field.number(), prompt(*field)));
    }
    text.trim_end().to_string()
}

fn field_for_label(label: &str) -> Option<VoiceField> {
    match label {
        "audience" | "audience level" | "level" => Some(VoiceField::AudienceLevel),
        "tone" | "voice" => Some(VoiceField::Tone),
        "assertiveness" | "push" => Some(VoiceField::Assertiveness),
        "verbosity" | "length" => Some(VoiceField::Verbosity),
        _ => None,
    }
}

/// Resolve an answer given either as an option name or an option number.
fn set_field(voice: &mut VoiceContract, field: VoiceField, answer: &str) -> bool {
    let answer = answer.trim().trim_end_matches('.');
    let key = match answer.parse::<usize>() {
        Ok(n) => match n.checked_sub(1).and_then(|i| field.options().get(i).copied()) {
            Some(key) => key.to_string(),
            None => return false,
        },
        Err(_) => answer.to_string(),
    };
    match field {
        VoiceField::AudienceLevel => key
            .parse::<AudienceLevel>()
            .map(|v| voice.audience_level = Some(v))
            .is_ok(),
        VoiceField::Tone => key.parse::<VoiceTone>().map(|v| voice.tone = Some(v)).is_ok(),
        VoiceField::Assertiveness => key
            .parse::<Assertiveness>()
            .map(|v| voice.assertiveness = Some(v))
            .is_ok(),
        VoiceField::Verbosity => key
            .parse::<Verbosity>()
            .map(|v| voice.verbosity = Some(v))
            .is_ok(),
    }
}

/// Apply voice answers in `text`; returns the fields that were set.
pub fn apply_voice_answers(voice: &mut VoiceContract, text: &str) -> Vec<VoiceField> {
    let mut filled = Vec::new();
    for line in answer_lines(text) {
        let (field, value) = match line {
            AnswerLine::Numbered(n, value) => (VoiceField::from_number(n), value),
            AnswerLine::Labeled(label, value) => (field_for_label(&label), value),
        };
        if let Some(field) = field {
            if set_field(voice, field, value) && !filled.contains(&field) {
                filled.push(field);
            }
        }
    }

    if filled.is_empty() {
        let missing = voice.missing_fields();
        let trimmed = text.trim();
        if missing.len() == 1 && !trimmed.contains('\n') && set_field(voice, missing[0], trimmed) {
            filled.push(missing[0]);
        }
    }
    filled
}
