//! Text normalization shared by the intake checks.

use std::collections::HashSet;

/// Normalize question text for comparison: lowercase, strip punctuation,
/// collapse whitespace.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized whitespace tokens, in order.
pub fn tokens(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Normalized tokens as a set, for overlap metrics.
pub fn token_set(text: &str) -> HashSet<String> {
    tokens(text).into_iter().collect()
}
