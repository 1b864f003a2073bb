//! Content policy filter.
//!
//! Scans every string leaf of a content object. Any hit invalidates the whole
//! object; each violation names the JSON path of the offending leaf.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{Violations, join_path};

static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<\s*/?\s*[A-Za-z][A-Za-z0-9-]*(?:\s[^<>]*)?/?\s*>").expect("valid html tag regex")
});
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bhttps?://|\bwww\.|\b[a-z0-9][a-z0-9-]*\.[a-z]{2,}/").expect("valid link regex")
});
static MARKDOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\*\*|__|`|^\s*#{1,6}\s|\[[^\]]*\]\([^)]*\)|^\s*[-*+]\s+\S")
        .expect("valid markdown regex")
});
static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{FE0F}]")
        .expect("valid emoji regex")
});
static BANNED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(revolutionary|cutting-edge|world-class|best-in-class|game-chang(?:er|ing)|synergy|seamless(?:ly)?|unleash|leverage|disrupt(?:ive)?|next-level|innovative|state-of-the-art)\b",
    )
    .expect("valid banned vocabulary regex")
});
static SUPERLATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bthe best\b|\bnumber one\b|#1\b|\bunparalleled\b|\bunmatched\b|\bextremely\b|\bincredibly\b|\btruly\b|\babsolutely\b|\b\w+est ever\b|!!",
    )
    .expect("valid superlative regex")
});

/// Check every string leaf of `value` against the policy.
pub fn check_policy(value: &Value) -> Result<(), Violations> {
    let mut violations = Vec::new();
    walk(value, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Check a single piece of text. `path` is used to label violations.
pub fn check_text(path: &str, text: &str, out: &mut Violations) {
    if HTML_TAG_RE.is_match(text) {
        out.push(format!("{path}: contains an HTML tag"));
    }
    if LINK_RE.is_match(text) {
        out.push(format!("{path}: contains a link"));
    }
    if MARKDOWN_RE.is_match(text) {
        out.push(format!("{path}: contains markdown formatting"));
    }
    if EMOJI_RE.is_match(text) {
        out.push(format!("{path}: contains an emoji"));
    }
    for m in BANNED_RE.find_iter(text) {
        out.push(format!("{path}: uses banned word '{}'", m.as_str().to_lowercase()));
    }
    if let Some(m) = SUPERLATIVE_RE.find(text) {
        out.push(format!("{path}: uses superlative or intensifier '{}'", m.as_str()));
    }
}

fn walk(value: &Value, path: &str, out: &mut Violations) {
    match value {
        Value::String(s) => check_text(if path.is_empty() { "value" } else { path }, s, out),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{path}[{i}]"), out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                walk(item, &join_path(path, key), out);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}
