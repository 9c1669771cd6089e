//! Text similarity primitives for match scoring and deduplication.
//!
//! All comparisons work on case-folded, stop-word-stripped word sets;
//! word order is deliberately ignored so reordered or lightly reworded
//! titles still compare as close.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::model::surname_of;

/// English stop words stripped before set comparison.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "in", "into", "is",
        "its", "of", "on", "or", "over", "that", "the", "their", "to", "under", "via", "with",
    ]
    .into_iter()
    .collect()
});

/// Tokenize text into a normalized word set.
///
/// Case-folds, splits on non-alphanumeric boundaries, and drops stop
/// words and single-character fragments.
#[must_use]
pub fn normalize_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 1 && !STOP_WORDS.contains(w))
        .map(ToString::to_string)
        .collect()
}

/// Jaccard similarity of two sets: |A ∩ B| / |A ∪ B|.
///
/// Two empty sets compare as 0.0, not 1.0, so documents that normalize
/// to nothing never match anything.
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();

    #[allow(clippy::cast_precision_loss)]
    {
        intersection as f64 / union as f64
    }
}

/// Jaccard similarity of two titles after normalization.
#[must_use]
pub fn title_similarity(a: &str, b: &str) -> f64 {
    jaccard(&normalize_tokens(a), &normalize_tokens(b))
}

/// Fraction of source author surnames present in the candidate author
/// list, considering at most `max_authors` source authors.
#[must_use]
pub fn surname_overlap(source: &[String], candidate: &[String], max_authors: usize) -> f64 {
    let considered: Vec<String> = source
        .iter()
        .take(max_authors)
        .map(|a| surname_of(a).to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();

    if considered.is_empty() {
        return 0.0;
    }

    let candidate_surnames: HashSet<String> = candidate
        .iter()
        .map(|a| surname_of(a).to_lowercase())
        .collect();

    let matched = considered
        .iter()
        .filter(|s| candidate_surnames.contains(*s))
        .count();

    #[allow(clippy::cast_precision_loss)]
    {
        matched as f64 / considered.len() as f64
    }
}

/// Publication-year closeness: 1.0 at exact match, 0.5 at ±1 year, 0.0
/// beyond or when either side is unknown.
#[must_use]
pub fn year_closeness(source: Option<i32>, candidate: Option<i32>) -> f64 {
    match (source, candidate) {
        (Some(a), Some(b)) => match (a - b).abs() {
            0 => 1.0,
            1 => 0.5,
            _ => 0.0,
        },
        _ => 0.0,
    }
}
