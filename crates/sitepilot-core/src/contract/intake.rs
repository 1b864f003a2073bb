//! Intake contract: the five questions, answer parsing, and the summary.

use sitepilot_types::contract::{BlogPresence, IntakeContract, IntakeField};

use super::{AnswerLine, answer_lines};

fn question(field: IntakeField) -> &'static str {
    match field {
        IntakeField::Purpose => "What is the site for? (the business or project in a sentence)",
        IntakeField::Audience => "Who is it for?",
        IntakeField::Action => "What should a visitor do first? (call, book, buy, sign up...)",
        IntakeField::Tone => "How should it feel? (e.g. calm, friendly, formal)",
        IntakeField::Blog => "Do you want a blog? (yes / no / later)",
    }
}

/// Numbered questions for the given missing fields.
pub fn intake_questions(missing: &[IntakeField]) -> String {
    let mut text = String::from(
        "Before I plan anything I need a few answers. Reply with the numbers, e.g. `1. ...`:\n",
    );
    for field in missing {
        text.push_str(&format!("{}. {}\n", field.number(), question(*field)));
    }
    text.trim_end().to_string()
}

fn field_for_label(label: &str) -> Option<IntakeField> {
    match label {
        "purpose" | "goal" | "what" | "business" => Some(IntakeField::Purpose),
        "audience" | "who" | "customers" => Some(IntakeField::Audience),
        "action" | "cta" | "call to action" | "visitor action" => Some(IntakeField::Action),
        "tone" | "feel" | "mood" => Some(IntakeField::Tone),
        "blog" | "blog presence" => Some(IntakeField::Blog),
        _ => None,
    }
}

/// Normalise a blog answer to yes / no / later.
pub fn parse_blog(answer: &str) -> Option<BlogPresence> {
    let a = answer.trim().trim_end_matches(['.', '!']).to_lowercase();
    match a.as_str() {
        "yes" | "y" | "yeah" | "yep" | "sure" | "please" | "of course" => Some(BlogPresence::Yes),
        "no" | "n" | "nope" | "none" | "no blog" | "skip" | "not needed" => Some(BlogPresence::No),
        "later" | "maybe" | "not yet" | "eventually" | "maybe later" | "someday" => {
            Some(BlogPresence::Later)
        }
        _ if a.starts_with("yes") => Some(BlogPresence::Yes),
        _ if a.starts_with("no ") || a.starts_with("no,") => Some(BlogPresence::No),
        _ if a.contains("later") => Some(BlogPresence::Later),
        _ => None,
    }
}

fn set_field(intake: &mut IntakeContract, field: IntakeField, value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    match field {
        IntakeField::Purpose => intake.purpose = Some(value.to_string()),
        IntakeField::Audience => intake.audience = Some(value.to_string()),
        IntakeField::Action => intake.action = Some(value.to_string()),
        IntakeField::Tone => intake.tone = Some(value.to_string()),
        IntakeField::Blog => match parse_blog(value) {
            Some(b) => intake.blog_presence = Some(b),
            None => return false,
        },
    }
    true
}

/// Apply structured answers in `text` to the contract.
///
/// Numbered and labeled lines always count. When `awaiting` is set and exactly
/// one field is missing, a bare single-line reply fills that field. Later
/// answers overwrite earlier ones. Returns the fields that were filled.
pub fn apply_intake_answers(
    intake: &mut IntakeContract,
    text: &str,
    awaiting: bool,
) -> Vec<IntakeField> {
    let mut filled = Vec::new();
    for line in answer_lines(text) {
        let (field, value) = match line {
            AnswerLine::Numbered(n, value) => (IntakeField::from_number(n), value),
            AnswerLine::Labeled(label, value) => (field_for_label(&label), value),
        };
        if let Some(field) = field {
            if set_field(intake, field, value) && !filled.contains(&field) {
                filled.push(field);
            }
        }
    }

    if filled.is_empty() && awaiting {
        let missing = intake.missing_fields();
        let trimmed = text.trim();
        if missing.len() == 1 && !trimmed.is_empty() && !trimmed.contains('\n') {
            if set_field(intake, missing[0], trimmed) {
                filled.push(missing[0]);
            }
        }
    }
    filled
}

/// A short recap of the completed intake, ending with a proceed prompt.
pub fn intake_summary(intake: &IntakeContract) -> String {
    let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let blog = intake
        .blog_presence
        .map(|b| b.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Here is what I have:\n\
         1. Purpose: {}\n\
         2. Audience: {}\n\
         3. First action: {}\n\
         4. Tone: {}\n\
         5. Blog: {}\n\
         Shall I proceed? (yes, or send a numbered line to change an answer)",
        show(&intake.purpose),
        show(&intake.audience),
        show(&intake.action),
        show(&intake.tone),
        blog,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_list_only_missing_fields() {
        let text = intake_questions(&[IntakeField::Audience, IntakeField::Blog]);
        assert!(text.contains("2. Who is it for?"));
        assert!(text.contains("5. Do you want a blog?"));
        assert!(!text.contains("1. What is the site for?"));
    }

    #[test]
    fn test_numbered_answers() {
        let mut intake = IntakeContract::default();
        let filled = apply_intake_answers(
            &mut intake,
            "1. A bookkeeping practice\n2) small design studios\n3. book a call\n4. calm\n5. no",
            false,
        );
        assert_eq!(filled.len(), 5);
        assert!(intake.is_complete());
        assert_eq!(intake.blog_presence, Some(BlogPresence::No));
        assert_eq!(intake.audience.as_deref(), Some("small design studios"));
    }

    #[test]
    fn test_labeled_answers_and_overwrite() {
        let mut intake = IntakeContract {
            tone: Some("formal".to_string()),
            ..Default::default()
        };
        apply_intake_answers(&mut intake, "Tone: playful\nblog: maybe later", false);
        assert_eq!(intake.tone.as_deref(), Some("playful"));
        assert_eq!(intake.blog_presence, Some(BlogPresence::Later));
    }

    #[test]
    fn test_bare_reply_fills_single_missing_field_only_when_awaiting() {
        let mut intake = IntakeContract {
            purpose: Some("p".to_string()),
            audience: Some("a".to_string()),
            action: Some("c".to_string()),
            tone: Some("t".to_string()),
            blog_presence: None,
        };
        assert!(apply_intake_answers(&mut intake.clone(), "yes", false).is_empty());
        let filled = apply_intake_answers(&mut intake, "yes", true);
        assert_eq!(filled, vec![IntakeField::Blog]);
        assert_eq!(intake.blog_presence, Some(BlogPresence::Yes));
    }

    #[test]
    fn test_free_text_does_not_fill_anything() {
        let mut intake = IntakeContract::default();
        assert!(apply_intake_answers(&mut intake, "I want to build a site", true).is_empty());
        assert_eq!(intake.missing_fields().len(), 5);
    }

    #[test]
    fn test_unrecognised_blog_answer_is_ignored() {
        let mut intake = IntakeContract::default();
        let filled = apply_intake_answers(&mut intake, "5. purple", false);
        assert!(filled.is_empty());
        assert!(intake.blog_presence.is_none());
    }

    #[test]
    fn test_summary_lists_answers() {
        let intake = IntakeContract {
            purpose: Some("Pottery shop".to_string()),
            blog_presence: Some(BlogPresence::Yes),
            ..Default::default()
        };
        let s = intake_summary(&intake);
        assert!(s.contains("1. Purpose: Pottery shop"));
        assert!(s.contains("5. Blog: yes"));
        assert!(s.contains("Shall I proceed?"));
    }
}
