//! Intent detection behind a replaceable classifier.
//!
//! The default classifier is a data-driven table of regex patterns per
//! intent tag. Each tag is one independent detector; when more than one
//! fires, the turn asks the user to pick instead of guessing a priority.

use std::fmt;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// What a free-form message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentTag {
    Build,
    ContentEdit,
    Presentation,
    Release,
    Audit,
    Recommend,
    AdvisoryMode,
    Explain,
}

impl IntentTag {
    pub const ALL: &'static [IntentTag] = &[
        IntentTag::Build,
        IntentTag::ContentEdit,
        IntentTag::Presentation,
        IntentTag::Release,
        IntentTag::Audit,
        IntentTag::Recommend,
        IntentTag::AdvisoryMode,
        IntentTag::Explain,
    ];

    /// Short phrase used when asking the user to disambiguate.
    pub fn describe(&self) -> &'static str {
        match self {
            IntentTag::Build => "work on the site structure",
            IntentTag::ContentEdit => "write or edit copy",
            IntentTag::Presentation => "change the look",
            IntentTag::Release => "preview, publish or roll back",
            IntentTag::Audit => "audit the site",
            IntentTag::Recommend => "get recommendations",
            IntentTag::AdvisoryMode => "change how often I make suggestions",
            IntentTag::Explain => "get an explanation",
        }
    }

}

impl fmt::Display for IntentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentTag::Build => "build",
            IntentTag::ContentEdit => "content_edit",
            IntentTag::Presentation => "presentation",
            IntentTag::Release => "release",
            IntentTag::Audit => "audit",
            IntentTag::Recommend => "recommend",
            IntentTag::AdvisoryMode => "advisory_mode",
            IntentTag::Explain => "explain",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    None,
    One(IntentTag),
    Ambiguous(Vec<IntentTag>),
}

/// Maps a message to the intents it expresses.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, message: &str) -> Classification;
}

/// Default detector patterns, one list per intent tag.
pub const PATTERNS: &[(IntentTag, &[&str])] = &[
    (
        IntentTag::Build,
        &[
            r"\b(build|create|make|set up|start)\b.*\b(site|website|pages|plan|structure)\b",
            r"\bsite (plan|structure)\b",
        ],
    ),
    (
        IntentTag::ContentEdit,
        &[
            r"\b(write|rewrite|reword|draft|shorten|tighten)\b",
            r"\b(copy|headline|wording|tagline)\b",
        ],
    ),
    (
        IntentTag::Presentation,
        &[r"\b(theme|variant|layout|colou?r scheme|visual style)\b"],
    ),
    (
        IntentTag::Release,
        &[r"\b(publish|go live|launch|preview|roll ?back|revert|restore)\b"],
    ),
    (
        IntentTag::Audit,
        &[
            r"\baudit\b",
            r"\b(review|check|critique|assess)\b.*\b(site|website|pages?)\b",
        ],
    ),
    (
        IntentTag::Recommend,
        &[
            r"\b(recommend|recommendations?|suggest|suggestions?)\b",
            r"\bnext steps?\b",
            r"\bwhat (should i|to) (do|change|improve)\b",
        ],
    ),
    (
        IntentTag::AdvisoryMode,
        &[
            r"\b(proactive|quiet) mode\b",
            r"\b(be|go|turn on|switch to|enable) (more )?(proactive|quiet)\b",
            r"\bstop (suggesting|recommending)\b",
        ],
    ),
    (
        IntentTag::Explain,
        &[
            r"^\s*(why|explain|what is|what are|what does|how does|how do)\b",
            r"\bexplain\b",
        ],
    ),
];

/// Regex-table classifier.
pub struct RegexIntentClassifier {
    detectors: Vec<(IntentTag, Vec<Regex>)>,
}

impl RegexIntentClassifier {
    /// Build from a pattern table. Patterns are case-insensitive.
    pub fn from_patterns(table: &[(IntentTag, &[&str])]) -> Result<Self, regex::Error> {
        let detectors = table
            .iter()
            .map(|(tag, patterns)| {
                let compiled = patterns
                    .iter()
                    .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((*tag, compiled))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { detectors })
    }

    /// Tags whose detector fires, in table order.
    pub fn detect(&self, message: &str) -> Vec<IntentTag> {
        self.detectors
            .iter()
            .filter(|(_, patterns)| patterns.iter().any(|re| re.is_match(message)))
            .map(|(tag, _)| *tag)
            .collect()
    }
}

static BUILT_IN: LazyLock<RegexIntentClassifier> = LazyLock::new(|| {
    RegexIntentClassifier::from_patterns(PATTERNS).expect("valid built-in intent regexes")
});

impl Default for RegexIntentClassifier {
    fn default() -> Self {
        Self {
            detectors: BUILT_IN.detectors.clone(),
        }
    }
}

impl IntentClassifier for RegexIntentClassifier {
    fn classify(&self, message: &str) -> Classification {
        let mut fired = self.detect(message);
        match fired.len() {
            0 => Classification::None,
            1 => Classification::One(fired.remove(0)),
            _ => Classification::Ambiguous(fired),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(message: &str) -> Classification {
        RegexIntentClassifier::default().classify(message)
    }

    #[test]
    fn test_single_intents() {
        assert_eq!(classify("I want to build a site"), Classification::One(IntentTag::Build));
        assert_eq!(
            classify("Rewrite the hero headline"),
            Classification::One(IntentTag::ContentEdit)
        );
        assert_eq!(
            classify("switch to the calm theme"),
            Classification::One(IntentTag::Presentation)
        );
        assert_eq!(classify("publish it"), Classification::One(IntentTag::Release));
        assert_eq!(classify("Please audit"), Classification::One(IntentTag::Audit));
        assert_eq!(
            classify("what should I improve?"),
            Classification::One(IntentTag::Recommend)
        );
        assert_eq!(
            classify("switch to proactive mode"),
            Classification::One(IntentTag::AdvisoryMode)
        );
        assert_eq!(classify("hello there"), Classification::None);
    }

    #[test]
    fn test_multiple_site_intents_are_ambiguous() {
        assert_eq!(
            classify("publish the site and change the theme"),
            Classification::Ambiguous(vec![IntentTag::Presentation, IntentTag::Release])
        );
    }

    #[test]
    fn test_explain_with_site_intent_is_ambiguous() {
        assert_eq!(
            classify("Why would I publish a preview first?"),
            Classification::Ambiguous(vec![IntentTag::Release, IntentTag::Explain])
        );
        assert_eq!(
            classify("how do I publish the site?"),
            Classification::Ambiguous(vec![IntentTag::Release, IntentTag::Explain])
        );
        assert_eq!(
            classify("explain the theme and publish it"),
            Classification::Ambiguous(vec![
                IntentTag::Presentation,
                IntentTag::Release,
                IntentTag::Explain
            ])
        );
    }

    #[test]
    fn test_advisory_mode_with_site_intent_is_ambiguous() {
        assert_eq!(
            classify("switch to proactive mode and publish"),
            Classification::Ambiguous(vec![IntentTag::Release, IntentTag::AdvisoryMode])
        );
    }

    #[test]
    fn test_explain_alone() {
        assert_eq!(
            classify("why does the hero come first?"),
            Classification::One(IntentTag::Explain)
        );
    }

    #[test]
    fn test_custom_table() {
        let classifier =
            RegexIntentClassifier::from_patterns(&[(IntentTag::Audit, &[r"\binspect\b"])]).unwrap();
        assert_eq!(classifier.classify("inspect it"), Classification::One(IntentTag::Audit));
        assert_eq!(classifier.classify("audit"), Classification::None);
        assert!(RegexIntentClassifier::from_patterns(&[(IntentTag::Audit, &["("])]).is_err());
    }
}
