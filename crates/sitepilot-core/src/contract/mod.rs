//! Contract intake: parsing structured answers, building the questions, and
//! deriving the design intent.

pub mod design;
pub mod intake;
pub mod voice;

use std::sync::LazyLock;

use regex::Regex;

static NUMBERED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})\s*[.):\-]\s*(.+?)\s*$").expect("valid numbered answer regex")
});
static LABELED_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z _-]{1,24}?)\s*[:=]\s*(.+?)\s*$").expect("valid labeled answer regex")
});

/// One structured answer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AnswerLine<'a> {
    Numbered(usize, &'a str),
    Labeled(String, &'a str),
}

/// Split a reply into numbered (`1. ...`, `2) ...`) and labeled
/// (`purpose: ...`) answer lines. Unstructured lines are skipped.
pub(crate) fn answer_lines(text: &str) -> Vec<AnswerLine<'_>> {
    text.lines()
        .filter_map(|line| {
            if let Some(caps) = NUMBERED_LINE_RE.captures(line) {
                let n = caps[1].parse().ok()?;
                let value = caps.get(2)?.as_str();
                return Some(AnswerLine::Numbered(n, value));
            }
            let caps = LABELED_LINE_RE.captures(line)?;
            let label = caps[1].trim().to_lowercase().replace(['_', '-'], " ");
            Some(AnswerLine::Labeled(label, caps.get(2)?.as_str()))
        })
        .collect()
}
