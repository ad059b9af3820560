//! Moderation filter for incoming question text.
//!
//! Deterministic lexical classifier: a profanity lexicon plus rule-based
//! spam scoring. Given the same lexicon and configuration, the verdict for
//! a given text never changes.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ModerationConfig;
use crate::intake::text::tokens;

/// Built-in disallowed terms. Matched against normalized tokens, so
/// punctuation and casing do not evade the filter.
const BUILTIN_TERMS: &[&str] = &[
    "muji", "randi", "machikne", "fuck", "bitch", "idiot", "stupid",
];

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://").expect("static regex"));

static REPEATED_CHAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)\1{4,}").expect("static regex"));

/// Classification label for a moderated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationLabel {
    Safe,
    Harassment,
    Spam,
}

/// Outcome of a moderation check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationVerdict {
    /// Whether the text is disallowed.
    pub flagged: bool,
    /// Classification label.
    pub label: ModerationLabel,
    /// Confidence in the label (1.0 for lexicon hits).
    pub confidence: f32,
}

impl ModerationVerdict {
    fn safe() -> Self {
        Self {
            flagged: false,
            label: ModerationLabel::Safe,
            confidence: 1.0,
        }
    }
}

/// Lexicon- and heuristic-based moderation filter.
pub struct ModerationFilter {
    lexicon: HashSet<String>,
    spam_threshold: f32,
}

impl ModerationFilter {
    /// Build a filter from configuration, merging extra terms into the
    /// built-in lexicon.
    pub fn new(config: &ModerationConfig) -> Self {
        let mut lexicon: HashSet<String> =
            BUILTIN_TERMS.iter().map(|t| t.to_string()).collect();
        lexicon.extend(config.extra_terms.iter().map(|t| t.to_lowercase()));
        Self {
            lexicon,
            spam_threshold: config.spam_threshold,
        }
    }

    /// Classify question text. Spam heuristics run first, then the
    /// profanity lexicon; the first hit wins.
    pub fn check(&self, text: &str) -> ModerationVerdict {
        let spam_score = spam_score(text);
        if spam_score > self.spam_threshold {
            warn!(score = spam_score, "question rejected as spam");
            return ModerationVerdict {
                flagged: true,
                label: ModerationLabel::Spam,
                confidence: spam_score,
            };
        }

        for token in tokens(text) {
            if self.lexicon.contains(&token) {
                return ModerationVerdict {
                    flagged: true,
                    label: ModerationLabel::Harassment,
                    confidence: 0.95,
                };
            }
        }

        ModerationVerdict::safe()
    }

    /// Convenience wrapper over [`check`](Self::check).
    pub fn is_flagged(&self, text: &str) -> bool {
        self.check(text).flagged
    }
}

/// Rule-based spam score in [0, 1].
///
/// Signals: more than one URL, a character repeated five or more times,
/// all-uppercase text, and repeated words.
fn spam_score(text: &str) -> f32 {
    let mut score: f32 = 0.0;
    if URL_PATTERN.find_iter(text).count() > 1 {
        score += 0.4;
    }
    if REPEATED_CHAR_PATTERN.is_match(text) {
        score += 0.3;
    }
    if !text.is_empty() && text.chars().any(|c| c.is_alphabetic()) && text == text.to_uppercase() {
        score += 0.2;
    }
    let words = tokens(text);
    let unique: HashSet<&String> = words.iter().collect();
    if words.len() != unique.len() {
        score += 0.1;
    }
    score.min(1.0)
}
