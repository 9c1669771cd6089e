//! Pattern-based identifier extraction from raw document text.

use once_cell::sync::Lazy;
use regex::Regex;

/// How many characters of the document head are scanned by default.
/// Identifiers almost always appear on the first page.
const DEFAULT_HEAD_LEN: usize = 2_000;

/// Punctuation commonly glued onto the end of an in-text identifier.
const TRAILING_PUNCT: &[char] = &['.', ',', ';', ':', ')', ']', '}', '\'', '"', '>'];

/// Ordered identifier pattern rules: labelled forms first, then URL
/// forms, then bare forms. The first rule that matches wins.
static DOI_RULES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        (
            "labelled",
            Regex::new(r"(?i)\bdoi\s*[:=]?\s*(10\.\d{4,9}/\S+)").expect("labelled DOI pattern"),
        ),
        (
            "url",
            Regex::new(r"(?i)(?:https?://)?(?:dx\.)?doi\.org/(10\.\d{4,9}/\S+)")
                .expect("URL DOI pattern"),
        ),
        (
            "bare",
            Regex::new(r"\b(10\.\d{4,9}/\S+)").expect("bare DOI pattern"),
        ),
    ]
});

/// Extracts a candidate identifier from document text without any
/// network call. Used for the early duplicate short-circuit before the
/// expensive stages run.
#[derive(Debug, Clone)]
pub struct IdentityExtractor {
    head_len: usize,
}

impl Default for IdentityExtractor {
    fn default() -> Self {
        Self {
            head_len: DEFAULT_HEAD_LEN,
        }
    }
}

impl IdentityExtractor {
    /// Create an extractor scanning the first `head_len` characters.
    #[must_use]
    pub const fn with_head_len(head_len: usize) -> Self {
        Self { head_len }
    }

    /// Extract the first identifier matching any rule, with trailing
    /// punctuation trimmed. Returns `None` when no rule matches.
    #[must_use]
    pub fn extract(&self, raw_text: &str) -> Option<String> {
        let head: String = raw_text.chars().take(self.head_len).collect();

        for (rule, pattern) in DOI_RULES.iter() {
            if let Some(caps) = pattern.captures(&head) {
                let raw = caps.get(1)?.as_str();
                let trimmed = raw.trim_end_matches(TRAILING_PUNCT);
                if trimmed.is_empty() {
                    continue;
                }
                tracing::debug!(rule, doi = trimmed, "Extracted candidate identifier");
                return Some(trimmed.to_string());
            }
        }

        None
    }
}

/// Normalize an identifier for comparison: lowercase, URL prefix and
/// surrounding whitespace stripped.
#[must_use]
pub fn normalize_doi(doi: &str) -> String {
    let trimmed = doi.trim().to_lowercase();
    let stripped = trimmed
        .strip_prefix("https://doi.org/")
        .or_else(|| trimmed.strip_prefix("http://doi.org/"))
        .or_else(|| trimmed.strip_prefix("https://dx.doi.org/"))
        .or_else(|| trimmed.strip_prefix("http://dx.doi.org/"))
        .unwrap_or(&trimmed);
    stripped.trim_end_matches(TRAILING_PUNCT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_labelled_doi() {
        let extractor = IdentityExtractor::default();
        let text = "Nature Medicine, 2023.\nDOI: 10.1038/s41591-023-02345-6\nAbstract...";
        assert_eq!(
            extractor.extract(text).as_deref(),
            Some("10.1038/s41591-023-02345-6")
        );
    }

    #[test]
    fn test_extract_url_doi() {
        let extractor = IdentityExtractor::default();
        let text = "Available at https://doi.org/10.1126/science.abc1234, accessed 2023.";
        assert_eq!(
            extractor.extract(text).as_deref(),
            Some("10.1126/science.abc1234")
        );
    }

    #[test]
    fn test_extract_bare_doi() {
        let extractor = IdentityExtractor::default();
        let text = "Cite as 10.1371/journal.pone.0123456 in references.";
        assert_eq!(
            extractor.extract(text).as_deref(),
            Some("10.1371/journal.pone.0123456")
        );
    }

    #[test]
    fn test_extract_trims_trailing_punctuation() {
        let extractor = IdentityExtractor::default();
        let text = "See doi:10.1000/xyz123. For details...";
        assert_eq!(extractor.extract(text).as_deref(), Some("10.1000/xyz123"));

        let text = "(doi: 10.1000/abc456)";
        assert_eq!(extractor.extract(text).as_deref(), Some("10.1000/abc456"));
    }

    #[test]
    fn test_extract_labelled_wins_over_bare() {
        let extractor = IdentityExtractor::default();
        // A bare identifier appears first in the text, but the labelled
        // rule is tried first across the whole head.
        let text = "ISSN 10.9999/wrong-one ... DOI: 10.1038/right-one";
        assert_eq!(extractor.extract(text).as_deref(), Some("10.1038/right-one"));
    }

    #[test]
    fn test_extract_respects_head_window() {
        let extractor = IdentityExtractor::with_head_len(50);
        let mut text = "x".repeat(60);
        text.push_str(" doi: 10.1000/beyond-window");
        assert_eq!(extractor.extract(&text), None);
    }

    #[test]
    fn test_extract_none_without_identifier() {
        let extractor = IdentityExtractor::default();
        assert_eq!(extractor.extract("No identifier in this text at all."), None);
        assert_eq!(extractor.extract(""), None);
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("10.1000/XYZ"), "10.1000/xyz");
        assert_eq!(normalize_doi("https://doi.org/10.1000/xyz"), "10.1000/xyz");
        assert_eq!(normalize_doi("http://dx.doi.org/10.1000/xyz."), "10.1000/xyz");
        assert_eq!(normalize_doi("  10.1000/xyz;  "), "10.1000/xyz");
    }
}
