//! Search strategy descriptors for the registry searcher.
//!
//! The searcher iterates one ordered table of descriptors instead of a
//! pile of near-duplicate search functions; each descriptor knows its
//! name, its strategy class (which picks the accept threshold), and how
//! to phrase its queries for the registry's inconsistent syntax.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::PaperIdentity;

/// Longest cleaned title used in a query.
const MAX_TITLE_LEN: usize = 200;

/// Word count of the partial-title phrasing.
const PARTIAL_TITLE_WORDS: usize = 10;

/// Secondary authors tried by the fallback strategy (authors 2..=5).
const SECONDARY_AUTHOR_RANGE: std::ops::Range<usize> = 1..5;

/// Keywords used by the last-resort strategy.
const MAX_QUERY_KEYWORDS: usize = 4;

static TITLE_CLEANER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s\-:()]").expect("title cleaner pattern"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Strategy class; decides which accept threshold applies.
///
/// Identifier matches are unique-key lookups and get the lower bar;
/// heuristic matches carry higher false-positive risk and get the
/// higher bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Exact-identifier lookup.
    Identifier,
    /// Fuzzy title/author/keyword lookup.
    Heuristic,
}

/// One entry of the ordered strategy table.
pub struct SearchStrategy {
    /// Stable strategy name, used in scores and logs.
    pub name: &'static str,
    /// Strategy class.
    pub kind: StrategyKind,
    build: fn(&PaperIdentity) -> Vec<String>,
}

impl SearchStrategy {
    /// Build the query phrasings for this strategy.
    ///
    /// An empty result means the identity lacks the fields this strategy
    /// needs and the searcher moves on.
    #[must_use]
    pub fn queries(&self, identity: &PaperIdentity) -> Vec<String> {
        (self.build)(identity)
    }
}

impl std::fmt::Debug for SearchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchStrategy")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// The ordered strategy table, tightest query first.
pub static STRATEGIES: &[SearchStrategy] = &[
    SearchStrategy {
        name: "exact-identifier",
        kind: StrategyKind::Identifier,
        build: build_identifier_queries,
    },
    SearchStrategy {
        name: "short-title-author",
        kind: StrategyKind::Heuristic,
        build: build_short_title_author,
    },
    SearchStrategy {
        name: "title-author-no-year",
        kind: StrategyKind::Heuristic,
        build: build_title_author_no_year,
    },
    SearchStrategy {
        name: "partial-title-author",
        kind: StrategyKind::Heuristic,
        build: build_partial_title_author,
    },
    SearchStrategy {
        name: "secondary-author",
        kind: StrategyKind::Heuristic,
        build: build_secondary_author,
    },
    SearchStrategy {
        name: "keyword-author",
        kind: StrategyKind::Heuristic,
        build: build_keyword_author,
    },
];

/// Clean a title for query use: strip special characters, collapse
/// whitespace, cap the length.
#[must_use]
pub fn clean_title(title: &str) -> String {
    let cleaned = TITLE_CLEANER.replace_all(title, " ");
    let collapsed = WHITESPACE.replace_all(&cleaned, " ");
    let trimmed = collapsed.trim();
    trimmed.chars().take(MAX_TITLE_LEN).collect()
}

/// Identifier lookups, phrased multiple ways because provider syntax is
/// inconsistent.
fn build_identifier_queries(identity: &PaperIdentity) -> Vec<String> {
    let Some(doi) = identity.doi.as_deref() else {
        return Vec::new();
    };
    let doi = doi.trim();
    if doi.is_empty() {
        return Vec::new();
    }

    vec![format!("\"{doi}\"[AID]"), format!("{doi}[DOI]")]
}

fn primary_surname(identity: &PaperIdentity) -> Option<String> {
    identity
        .author_surname(0)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn build_short_title_author(identity: &PaperIdentity) -> Vec<String> {
    let title = clean_title(&identity.title);
    if title.len() < 10 {
        return Vec::new();
    }
    let Some(surname) = primary_surname(identity) else {
        return Vec::new();
    };

    let mut query = format!("\"{title}\"[Title] AND {surname}[Author]");
    if let Some(year) = identity.year {
        query.push_str(&format!(" AND {year}[PDAT]"));
    }
    vec![query]
}

/// The loosened phrasing: same as above with the year filter dropped.
fn build_title_author_no_year(identity: &PaperIdentity) -> Vec<String> {
    if identity.year.is_none() {
        // Nothing to loosen; the previous strategy already ran this query.
        return Vec::new();
    }
    let title = clean_title(&identity.title);
    if title.len() < 10 {
        return Vec::new();
    }
    let Some(surname) = primary_surname(identity) else {
        return Vec::new();
    };

    vec![format!("\"{title}\"[Title] AND {surname}[Author]")]
}

fn build_partial_title_author(identity: &PaperIdentity) -> Vec<String> {
    let title = clean_title(&identity.title);
    let partial: Vec<&str> = title.split_whitespace().take(PARTIAL_TITLE_WORDS).collect();
    if partial.len() < 3 {
        return Vec::new();
    }
    let Some(surname) = primary_surname(identity) else {
        return Vec::new();
    };

    vec![format!(
        "{}[Title] AND {surname}[Author]",
        partial.join(" ")
    )]
}

/// Full title paired with each secondary author in turn.
fn build_secondary_author(identity: &PaperIdentity) -> Vec<String> {
    let title = clean_title(&identity.title);
    if title.len() < 10 {
        return Vec::new();
    }

    SECONDARY_AUTHOR_RANGE
        .filter_map(|i| identity.author_surname(i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|surname| format!("\"{title}\"[Title] AND {surname}[Author]"))
        .collect()
}

/// Keyword set plus primary author. Highest false-positive risk, used
/// last and validated against the stricter heuristic threshold.
fn build_keyword_author(identity: &PaperIdentity) -> Vec<String> {
    let keywords: Vec<&str> = identity
        .keywords
        .iter()
        .map(String::as_str)
        .filter(|k| !k.trim().is_empty())
        .take(MAX_QUERY_KEYWORDS)
        .collect();
    if keywords.len() < 2 {
        return Vec::new();
    }
    let Some(surname) = primary_surname(identity) else {
        return Vec::new();
    };

    let joined = keywords
        .iter()
        .map(|k| format!("{k}[Keyword]"))
        .collect::<Vec<_>>()
        .join(" AND ");
    vec![format!("{joined} AND {surname}[Author]")]
}
