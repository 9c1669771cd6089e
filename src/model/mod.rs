//! Core data models threaded through the ingestion pipeline.

use serde::{Deserialize, Serialize};

/// Bibliographic identity of a paper, built up as the pipeline runs.
///
/// Extraction attaches a provisional DOI; a validated registry match
/// attaches `external_id` and overwrites the extracted fields with the
/// registry's authoritative values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperIdentity {
    /// Paper title.
    pub title: String,

    /// Author names in source order ("Surname, Given" or "Given Surname").
    pub authors: Vec<String>,

    /// Publication year.
    pub year: Option<i32>,

    /// Journal name.
    pub journal: Option<String>,

    /// DOI, either extracted from the document text or registry-provided.
    pub doi: Option<String>,

    /// Identifier assigned by the external registry after a validated match.
    pub external_id: Option<String>,

    /// Subject keywords.
    pub keywords: Vec<String>,

    /// Citation count, attached best-effort during enrichment.
    pub citation_count: Option<u64>,
}

impl PaperIdentity {
    /// Create an identity with just a title.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the authors.
    #[must_use]
    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    /// Set the publication year.
    #[must_use]
    pub const fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Set the journal.
    #[must_use]
    pub fn with_journal(mut self, journal: impl Into<String>) -> Self {
        self.journal = Some(journal.into());
        self
    }

    /// Set the DOI.
    #[must_use]
    pub fn with_doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    /// The surname of the author at `index`, if present.
    ///
    /// Handles both "Surname, Given" and "Given Surname" forms.
    #[must_use]
    pub fn author_surname(&self, index: usize) -> Option<&str> {
        self.authors.get(index).map(|a| surname_of(a))
    }

    /// Merge authoritative registry fields over the extracted ones.
    ///
    /// Registry values win wherever present; extracted values survive only
    /// in fields the registry record leaves empty.
    pub fn merge_registry(&mut self, record: &RegistryRecord) {
        if !record.title.is_empty() {
            self.title = record.title.clone();
        }
        if !record.authors.is_empty() {
            self.authors = record.authors.clone();
        }
        if record.year.is_some() {
            self.year = record.year;
        }
        if record.journal.is_some() {
            self.journal = record.journal.clone();
        }
        if record.doi.is_some() {
            self.doi = record.doi.clone();
        }
        if !record.keywords.is_empty() {
            self.keywords = record.keywords.clone();
        }
        self.external_id = Some(record.id.clone());
    }
}

/// Extract the surname from a single author name.
#[must_use]
pub fn surname_of(author: &str) -> &str {
    if let Some((surname, _)) = author.split_once(',') {
        surname.trim()
    } else {
        author.split_whitespace().last().unwrap_or(author)
    }
}

/// Full record fetched from the external registry for one identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Registry-assigned identifier.
    pub id: String,
    /// Canonical title.
    pub title: String,
    /// Canonical author list.
    pub authors: Vec<String>,
    /// Publication year.
    pub year: Option<i32>,
    /// Journal name.
    pub journal: Option<String>,
    /// Registry-verified DOI.
    pub doi: Option<String>,
    /// Subject keywords.
    pub keywords: Vec<String>,
}

/// Weighted similarity score for one match candidate.
///
/// Ephemeral: used only for the accept/reject decision, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    /// Title word-set similarity contribution (0..=title weight).
    pub title_score: f64,
    /// Author-surname overlap contribution (0..=author weight).
    pub author_score: f64,
    /// Publication-year closeness contribution (0..=year weight).
    pub year_score: f64,
    /// Sum of the three components.
    pub total: f64,
    /// Accept threshold applied to this candidate.
    pub threshold: f64,
    /// Name of the search strategy that produced the candidate.
    pub strategy: &'static str,
}

impl MatchScore {
    /// Build a score from its components.
    #[must_use]
    pub fn new(
        title_score: f64,
        author_score: f64,
        year_score: f64,
        threshold: f64,
        strategy: &'static str,
    ) -> Self {
        Self {
            title_score,
            author_score,
            year_score,
            total: title_score + author_score + year_score,
            threshold,
            strategy,
        }
    }

    /// Whether the candidate clears its strategy-class threshold.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.total >= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surname_of_comma_form() {
        assert_eq!(surname_of("Yamada, Taro"), "Yamada");
        assert_eq!(surname_of("van der Berg, Anna"), "van der Berg");
    }

    #[test]
    fn test_surname_of_plain_form() {
        assert_eq!(surname_of("Taro Yamada"), "Yamada");
        assert_eq!(surname_of("Curie"), "Curie");
    }

    #[test]
    fn test_author_surname_by_index() {
        let identity = PaperIdentity::new("Test")
            .with_authors(vec!["Sato, Hanako".to_string(), "John Smith".to_string()]);

        assert_eq!(identity.author_surname(0), Some("Sato"));
        assert_eq!(identity.author_surname(1), Some("Smith"));
        assert_eq!(identity.author_surname(2), None);
    }

    #[test]
    fn test_merge_registry_overwrites() {
        let mut identity = PaperIdentity::new("extracted titel with typo")
            .with_authors(vec!["A. Uthor".to_string()])
            .with_year(2020)
            .with_doi("10.1000/extracted");

        let record = RegistryRecord {
            id: "W123".to_string(),
            title: "Extracted Title Without Typo".to_string(),
            authors: vec!["Uthor, Alice".to_string(), "Writer, Bob".to_string()],
            year: Some(2021),
            journal: Some("Nature".to_string()),
            doi: Some("10.1000/canonical".to_string()),
            keywords: vec!["biology".to_string()],
        };

        identity.merge_registry(&record);

        assert_eq!(identity.title, "Extracted Title Without Typo");
        assert_eq!(identity.authors.len(), 2);
        assert_eq!(identity.year, Some(2021));
        assert_eq!(identity.journal.as_deref(), Some("Nature"));
        assert_eq!(identity.doi.as_deref(), Some("10.1000/canonical"));
        assert_eq!(identity.external_id.as_deref(), Some("W123"));
    }

    #[test]
    fn test_merge_registry_keeps_extracted_when_registry_empty() {
        let mut identity = PaperIdentity::new("Kept Title")
            .with_year(2019)
            .with_doi("10.1000/kept");

        let record = RegistryRecord {
            id: "W9".to_string(),
            ..RegistryRecord::default()
        };

        identity.merge_registry(&record);

        assert_eq!(identity.title, "Kept Title");
        assert_eq!(identity.year, Some(2019));
        assert_eq!(identity.doi.as_deref(), Some("10.1000/kept"));
        assert_eq!(identity.external_id.as_deref(), Some("W9"));
    }

    #[test]
    fn test_match_score_total_and_accept() {
        let score = MatchScore::new(54.0, 30.0, 10.0, 85.0, "short-title-author");
        assert!((score.total - 94.0).abs() < f64::EPSILON);
        assert!(score.accepted());

        let below = MatchScore::new(40.0, 30.0, 10.0, 85.0, "short-title-author");
        assert!(!below.accepted());
    }

    #[test]
    fn test_same_score_different_threshold() {
        // An 82-point candidate passes the identifier bar but not the
        // heuristic bar.
        let identifier = MatchScore::new(42.0, 30.0, 10.0, 80.0, "exact-identifier");
        let heuristic = MatchScore::new(42.0, 30.0, 10.0, 85.0, "keyword-author");

        assert!(identifier.accepted());
        assert!(!heuristic.accepted());
    }
}
