//! Duplicate-question detection against a course's answered queries.
//!
//! Two tiers: an exact tier over SHA-256 digests of normalized text, and a
//! token-set Jaccard tier for near-duplicates. Both are symmetric and
//! deterministic, scoring in [0, 1].

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::intake::text::{normalize, token_set};
use crate::store::Query;

/// A sufficiently-similar answered query.
#[derive(Debug, Clone)]
pub struct FaqMatch {
    /// The matched answered query.
    pub query: Query,
    /// Similarity score in [0, 1].
    pub score: f32,
}

/// Strategy seam for duplicate detection.
///
/// Pure: implementations read the candidate slice and never mutate state.
pub trait SimilarityMatcher: Send + Sync {
    /// Return the closest sufficiently-similar candidate, or none.
    ///
    /// Candidates are expected to be answered queries from a single course.
    fn best_match(&self, question: &str, candidates: &[Query]) -> Option<FaqMatch>;
}

/// Default matcher: exact digest fast path, then token-set Jaccard.
pub struct TokenOverlapMatcher {
    threshold: f32,
}

impl TokenOverlapMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// SHA-256 over normalized text, for the exact tier.
    fn digest(text: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(normalize(text).as_bytes());
        hasher.finalize().into()
    }
}

impl SimilarityMatcher for TokenOverlapMatcher {
    fn best_match(&self, question: &str, candidates: &[Query]) -> Option<FaqMatch> {
        if candidates.is_empty() {
            return None;
        }

        let question_digest = Self::digest(question);
        let question_tokens = token_set(question);

        let mut best: Option<FaqMatch> = None;
        for candidate in candidates {
            let score = if Self::digest(&candidate.question) == question_digest {
                1.0
            } else {
                jaccard(&question_tokens, &token_set(&candidate.question))
            };
            if score < self.threshold {
                continue;
            }

            let better = match &best {
                None => true,
                Some(current) => {
                    score > current.score
                        // Ties go to the most recently answered candidate.
                        || (score == current.score
                            && candidate.answered_at > current.query.answered_at)
                }
            };
            if better {
                best = Some(FaqMatch {
                    query: candidate.clone(),
                    score,
                });
            }
        }
        best
    }
}

/// Jaccard similarity over token sets: |a ∩ b| / |a ∪ b|.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f32 / union as f32
}
