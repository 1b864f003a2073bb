//! Prompts and output validators for the three generative steps: site plan,
//! section copy, and explanations.

use std::sync::LazyLock;

use schemars::schema_for;
use serde_json::Value;

use sitepilot_types::contract::{DesignIntent, IntakeContract, VoiceContract};
use sitepilot_types::conversation::ConversationMessage;
use sitepilot_types::llm::{Message, MessageRole};
use sitepilot_types::plan::SitePlan;
use sitepilot_types::site::{PageKind, Section, SiteData};

use crate::llm::generative::GenerationPrompt;
use crate::validate::catalog::{DISALLOWED_PLAN_KEYS, allowed_sections, describe_shape};
use crate::validate::plan_grammar::validate_plan;
use crate::validate::policy::check_text;
use crate::validate::{Violations, validate_section_content};

const JSON_ONLY: &str = "Reply with exactly one JSON object and nothing else.";

/// Recent history as provider messages, followed by the current message.
///
/// System messages are dropped and consecutive same-role messages merged, so
/// the sequence alternates the way the provider expects.
pub fn conversation(history: &[ConversationMessage], message: &str) -> Vec<Message> {
    let mut out: Vec<Message> = Vec::new();
    let turns = history
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| (m.role, m.content.as_str()))
        .chain(std::iter::once((MessageRole::User, message)));
    for (role, content) in turns {
        match out.last_mut() {
            Some(last) if last.role == role => {
                last.content.push_str("\n\n");
                last.content.push_str(content);
            }
            _ => out.push(Message {
                role,
                content: content.to_string(),
            }),
        }
    }
    // Providers require the first message to come from the user.
    while out.first().is_some_and(|m| m.role != MessageRole::User) {
        out.remove(0);
    }
    out
}

fn intake_block(intake: &IntakeContract) -> String {
    let show = |v: &Option<String>| v.as_deref().unwrap_or("-").to_string();
    format!(
        "Purpose: {}\nAudience: {}\nFirst visitor action: {}\nTone: {}\nBlog: {}",
        show(&intake.purpose),
        show(&intake.audience),
        show(&intake.action),
        show(&intake.tone),
        intake
            .blog_presence
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string()),
    )
}

/// Prompt for a structural site plan.
pub fn plan_prompt(
    intake: &IntakeContract,
    intent: &DesignIntent,
    history: &[ConversationMessage],
    message: &str,
) -> GenerationPrompt {
    let mut system = String::from(
        "You plan the page structure of small business websites. You decide which pages exist \
         and which sections each page carries, in order. You never write copy and never choose \
         colours, fonts or layouts.\n\n",
    );
    system.push_str(&format!("About the site:\n{}\n", intake_block(intake)));
    system.push_str(&format!(
        "Intended feel: {} gravity, {} temperature, {} prestige.\n\n",
        intent.visual_gravity, intent.emotional_temperature, intent.prestige_level
    ));
    system.push_str("Allowed sections per page:\n");
    for page in PageKind::ALL {
        if *page == PageKind::Blog && intake.blog_excluded() {
            continue;
        }
        let allowed: Vec<&str> = allowed_sections(*page).iter().map(|s| s.key()).collect();
        system.push_str(&format!("- {page}: {}\n", allowed.join(", ")));
    }
    system.push_str(
        "\nRules: every page starts with exactly one hero section; ctaPrimary, if present, is \
         last; no section type repeats on a page; blogFeed and blogFeatured only on the blog page. \
         A home page is required.\n",
    );
    if intake.blog_excluded() {
        system.push_str("The site must not have a blog page.\n");
    }
    system.push_str(&format!(
        "Never use these field names anywhere: {}.\n\n",
        DISALLOWED_PLAN_KEYS.join(", ")
    ));
    system.push_str(&format!(
        "Output the plan matching this JSON Schema, plus a top-level \"rationale\" string of \
         one or two plain sentences explaining the structure:\n{}\n",
        plan_schema()
    ));
    system.push_str(JSON_ONLY);
    GenerationPrompt::new(system, conversation(history, message))
}

/// JSON Schema of a site plan, rendered once.
fn plan_schema() -> &'static str {
    static SCHEMA: LazyLock<String> = LazyLock::new(|| {
        serde_json::to_string(&schema_for!(SitePlan)).unwrap_or_default()
    });
    &SCHEMA
}

/// Validate a plan reply; returns the typed plan and its rationale.
pub fn check_plan_reply(raw: &Value, intake: &IntakeContract) -> Result<(SitePlan, String), Violations> {
    let mut value = raw.clone();
    let rationale = match value.as_object_mut().and_then(|o| o.remove("rationale")) {
        Some(Value::String(s)) => s,
        Some(_) => return Err(vec!["rationale: must be a string".to_string()]),
        None => String::new(),
    };
    let plan = validate_plan(&value, intake)?;
    if !plan.pages.contains_key(&PageKind::Home) {
        return Err(vec!["plan must include a home page".to_string()]);
    }
    let mut violations = Vec::new();
    check_text("rationale", &rationale, &mut violations);
    if violations.is_empty() {
        Ok((plan, rationale))
    } else {
        Err(violations)
    }
}

fn voice_block(voice: &VoiceContract) -> String {
    let show = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    format!(
        "Audience level: {}\nTone: {}\nAssertiveness: {}\nVerbosity: {}",
        show(voice.audience_level.map(|v| v.to_string())),
        show(voice.tone.map(|v| v.to_string())),
        show(voice.assertiveness.map(|v| v.to_string())),
        show(voice.verbosity.map(|v| v.to_string())),
    )
}

/// Prompt for one section's copy.
pub fn content_prompt(
    intake: &IntakeContract,
    voice: &VoiceContract,
    page: PageKind,
    section: &Section,
    history: &[ConversationMessage],
    message: &str,
) -> GenerationPrompt {
    let mut system = format!(
        "You write website copy for one section at a time.\n\n\
         About the site:\n{}\n\nVoice:\n{}\n\n\
         Section: {} on the {page} page.\n",
        intake_block(intake),
        voice_block(voice),
        section.section_type,
    );
    if let Some(existing) = &section.content {
        system.push_str(&format!("Current copy: {existing}\n"));
    }
    system.push_str(&format!(
        "\nOutput shape: {}\n\
         Plain text only: no HTML, links, markdown, emoji, hype words or superlatives. \
         Respect the length limits.\n",
        describe_shape(section.section_type)
    ));
    system.push_str(JSON_ONLY);
    GenerationPrompt::new(system, conversation(history, message))
}

/// Validate generated copy for a section.
pub fn check_content_reply(raw: &Value, section: &Section) -> Result<Value, Violations> {
    validate_section_content(section.section_type, raw)
}

/// Prompt for a plain-language answer about the site or the process.
pub fn explain_prompt(
    intake: &IntakeContract,
    data: Option<&SiteData>,
    history: &[ConversationMessage],
    message: &str,
) -> GenerationPrompt {
    let mut system = String::from(
        "You are a website co-pilot explaining your reasoning to a small business owner. \
         Answer in two to four plain sentences. No lists, markdown, links or emoji.\n\n",
    );
    system.push_str(&format!("About the site:\n{}\n", intake_block(intake)));
    if let Some(data) = data {
        system.push_str(&format!("Theme: {}\n", data.theme));
        for page in &data.pages {
            let sections: Vec<&str> = page.sections.iter().map(|s| s.section_type.key()).collect();
            system.push_str(&format!("- {} page: {}\n", page.kind, sections.join(", ")));
        }
    }
    system.push_str("\nOutput shape: {\"answer\": string}\n");
    system.push_str(JSON_ONLY);
    GenerationPrompt::new(system, conversation(history, message))
}

pub fn check_answer(raw: &Value) -> Result<String, Violations> {
    let answer = raw
        .get("answer")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| vec!["answer: must be a non-empty string".to_string()])?;
    let mut violations = Vec::new();
    check_text("answer", answer, &mut violations);
    if violations.is_empty() {
        Ok(answer.to_string())
    } else {
        Err(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitepilot_types::contract::BlogPresence;
    use sitepilot_types::conversation::ConversationId;

    fn intake(blog: BlogPresence) -> IntakeContract {
        IntakeContract {
            purpose: Some("Bookkeeping for studios".to_string()),
            audience: Some("studio owners".to_string()),
            action: Some("book a call".to_string()),
            tone: Some("calm".to_string()),
            blog_presence: Some(blog),
        }
    }

    #[test]
    fn test_conversation_merges_and_starts_with_user() {
        let id = ConversationId::new();
        let history = vec![
            ConversationMessage::new(id, MessageRole::Assistant, "Welcome", None),
            ConversationMessage::new(id, MessageRole::User, "hi", None),
            ConversationMessage::new(id, MessageRole::User, "still there?", None),
            ConversationMessage::new(id, MessageRole::Assistant, "yes", None),
        ];
        let msgs = conversation(&history, "build it");
        let roles: Vec<MessageRole> = msgs.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]);
        assert_eq!(msgs[0].content, "hi\n\nstill there?");
        assert_eq!(msgs[2].content, "build it");
    }

    #[test]
    fn test_plan_prompt_omits_excluded_blog() {
        let prompt = plan_prompt(&intake(BlogPresence::No), &DesignIntent::default(), &[], "build");
        assert!(prompt.system.contains("must not have a blog page"));
        assert!(!prompt.system.contains("- blog:"));
        let prompt = plan_prompt(&intake(BlogPresence::Yes), &DesignIntent::default(), &[], "build");
        assert!(prompt.system.contains("- blog: heroSplit"));
    }

    #[test]
    fn test_plan_prompt_carries_plan_schema() {
        let prompt = plan_prompt(&intake(BlogPresence::No), &DesignIntent::default(), &[], "build");
        assert!(prompt.system.contains("orderedSections"));
        assert!(prompt.system.contains("heroSplit"));
    }

    #[test]
    fn test_check_plan_reply() {
        let raw = json!({
            "pages": {"home": {"goal": "book calls", "orderedSections": ["heroSplit", "features", "ctaPrimary"]}},
            "rationale": "One focused page."
        });
        let (plan, rationale) = check_plan_reply(&raw, &intake(BlogPresence::No)).unwrap();
        assert_eq!(plan.section_count(), 3);
        assert_eq!(rationale, "One focused page.");

        let no_home = json!({"pages": {"about": {"goal": "g", "orderedSections": ["heroMinimal"]}}});
        assert!(check_plan_reply(&no_home, &intake(BlogPresence::No)).is_err());

        let styled = json!({"pages": {"home": {"goal": "g", "orderedSections": ["heroSplit"], "theme": "bold"}}});
        let err = check_plan_reply(&styled, &intake(BlogPresence::No)).unwrap_err();
        assert!(err[0].contains("theme"));
    }

    #[test]
    fn test_check_answer() {
        assert_eq!(
            check_answer(&json!({"answer": " Proof sits best before the ask. "})).unwrap(),
            "Proof sits best before the ask."
        );
        assert!(check_answer(&json!({"answer": ""})).is_err());
        assert!(check_answer(&json!({"answer": "It is the best layout ever!!"})).is_err());
    }
}
