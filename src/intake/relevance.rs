//! Subject relevance check for incoming questions.
//!
//! Compares question tokens against a course's topic keyword set. Short or
//! ambiguous questions default to on-topic: blocking a legitimate question
//! is worse than letting a marginal one through.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::IntakeConfig;
use crate::intake::text::tokens;

/// Outcome of a relevance check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    /// Whether the question counts as on-topic for the course.
    pub on_topic: bool,
    /// Fraction of question tokens found in the topic set.
    pub overlap: f32,
    /// False when the check had too little signal and defaulted to on-topic.
    pub confident: bool,
}

/// Topic-overlap relevance checker.
pub struct RelevanceChecker {
    threshold: f32,
    min_question_tokens: usize,
}

impl RelevanceChecker {
    pub fn new(config: &IntakeConfig) -> Self {
        Self {
            threshold: config.relevance_threshold,
            min_question_tokens: config.min_question_tokens,
        }
    }

    /// Check a question against a course's topic keywords.
    ///
    /// A course with no curated topics accepts everything; so does a
    /// question shorter than the configured minimum token count.
    pub fn check(&self, topic_keywords: &HashSet<String>, question: &str) -> RelevanceVerdict {
        if topic_keywords.is_empty() {
            return RelevanceVerdict {
                on_topic: true,
                overlap: 0.0,
                confident: false,
            };
        }

        let question_tokens = tokens(question);
        if question_tokens.len() < self.min_question_tokens {
            return RelevanceVerdict {
                on_topic: true,
                overlap: 0.0,
                confident: false,
            };
        }

        let matched = question_tokens
            .iter()
            .filter(|t| topic_keywords.contains(*t))
            .count();
        let overlap = matched as f32 / question_tokens.len() as f32;

        RelevanceVerdict {
            on_topic: overlap >= self.threshold,
            overlap,
            confident: true,
        }
    }

    /// Convenience wrapper over [`check`](Self::check).
    pub fn is_on_topic(&self, topic_keywords: &HashSet<String>, question: &str) -> bool {
        self.check(topic_keywords, question).on_topic
    }
}
