//! Submission-time intake pipeline.
//!
//! Every incoming question runs through three checks, in a fixed order:
//! moderation, subject relevance, duplicate detection. The order is part of
//! the contract: unsafe or off-topic content is rejected before any
//! matching effort is spent, and only on-topic questions are eligible for
//! FAQ resolution.

pub mod moderation;
pub mod relevance;
pub mod similarity;
pub mod text;

use serde::{Deserialize, Serialize};

use crate::store::Query;

pub use moderation::{ModerationFilter, ModerationLabel, ModerationVerdict};
pub use relevance::{RelevanceChecker, RelevanceVerdict};
pub use similarity::{jaccard, FaqMatch, SimilarityMatcher, TokenOverlapMatcher};

/// Why a submission was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The moderation filter flagged the text.
    Moderation,
    /// The question is not related to the course.
    OffTopic,
}

/// Outcome of submitting a question.
///
/// A tagged variant so callers must handle every case; rejections are part
/// of the normal intake flow, not errors.
#[derive(Debug, Clone)]
pub enum IntakeOutcome {
    /// The submission was rejected; no query was created.
    Rejected { reason: RejectReason },
    /// An answered query in the same course already covers this question.
    /// No new query is created and no notification is sent; the match is
    /// surfaced inline in the response.
    AutoAnswered { query: Query, score: f32 },
    /// A new pending query was persisted.
    Accepted { query: Query },
}

impl IntakeOutcome {
    /// The persisted or matched query, when one exists.
    pub fn query(&self) -> Option<&Query> {
        match self {
            Self::Rejected { .. } => None,
            Self::AutoAnswered { query, .. } | Self::Accepted { query } => Some(query),
        }
    }
}
