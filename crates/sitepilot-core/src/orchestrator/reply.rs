//! Classification of replies to a pending draft or question.

use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Affirmative,
    Negative,
    /// A bare option number, 1-based.
    Choice(usize),
    Other,
}

static CHOICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:option\s*|number\s*|#)?(\d{1,2})[.)]?$").expect("valid choice regex")
});
static AFFIRMATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(yes|y|yep|yeah|yup|sure|ok|okay|go ahead|do it|apply( it)?|confirm|sounds good|looks good|approve|proceed|build it|publish it|please do|let's do it|lets do it)\b",
    )
    .expect("valid affirmative regex")
});
static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(no|n|nope|nah|cancel|discard|don't|do not|not now|skip|never ?mind|reject)\b")
        .expect("valid negative regex")
});

impl Reply {
    pub fn classify(text: &str) -> Self {
        let normalized = text
            .trim()
            .trim_end_matches(['.', '!', '?'])
            .trim()
            .to_lowercase();
        if let Some(caps) = CHOICE_RE.captures(&normalized) {
            if let Ok(n) = caps[1].parse::<usize>() {
                if n > 0 {
                    return Reply::Choice(n);
                }
            }
        }
        if NEGATIVE_RE.is_match(&normalized) {
            Reply::Negative
        } else if AFFIRMATIVE_RE.is_match(&normalized) {
            Reply::Affirmative
        } else {
            Reply::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_and_negative() {
        for yes in ["yes", "Yes please!", "ok", "go ahead.", "Looks good", "build it"] {
            assert_eq!(Reply::classify(yes), Reply::Affirmative, "{yes}");
        }
        for no in ["no", "No thanks", "cancel", "not now", "nevermind"] {
            assert_eq!(Reply::classify(no), Reply::Negative, "{no}");
        }
    }

    #[test]
    fn test_choices() {
        assert_eq!(Reply::classify("2"), Reply::Choice(2));
        assert_eq!(Reply::classify(" 3. "), Reply::Choice(3));
        assert_eq!(Reply::classify("option 1"), Reply::Choice(1));
        assert_eq!(Reply::classify("#2"), Reply::Choice(2));
        assert_eq!(Reply::classify("0"), Reply::Other);
    }

    #[test]
    fn test_other() {
        assert_eq!(Reply::classify("now write the about page"), Reply::Other);
        assert_eq!(Reply::classify("yesterday was fine"), Reply::Other);
        assert_eq!(Reply::classify("change the theme"), Reply::Other);
    }
}
