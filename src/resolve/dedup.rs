//! Duplicate detection against the destination store.

use std::sync::Arc;

use crate::model::PaperIdentity;
use crate::services::{DestinationStore, StoredRecord};

use super::extractor::normalize_doi;
use super::similarity::title_similarity;

/// Checks candidate papers against the destination store, before and
/// after enrichment.
///
/// Archived records never count as existing, so a paper whose previous
/// record was removed is ingested again rather than silently dropped.
/// Store query failures are logged and treated as "no duplicate": a
/// flaky store must not block ingestion.
pub struct DeduplicationResolver {
    destination: Arc<dyn DestinationStore>,
    title_threshold: f64,
}

impl DeduplicationResolver {
    /// Create a resolver with the given title-similarity floor.
    #[must_use]
    pub fn new(destination: Arc<dyn DestinationStore>, title_threshold: f64) -> Self {
        Self {
            destination,
            title_threshold,
        }
    }

    /// Pre-enrichment check: does the provisional identifier already
    /// exist, reachable, in the destination store?
    ///
    /// A hit short-circuits the whole pipeline for this file before any
    /// registry call is made.
    pub async fn check_provisional(&self, doi: &str) -> Option<StoredRecord> {
        self.find_live_by_doi(doi).await
    }

    /// Post-enrichment check: re-check by identifier, then by title
    /// similarity against the store's own query results.
    ///
    /// The title pass catches papers with no extractable identifier up
    /// front.
    pub async fn check_enriched(&self, identity: &PaperIdentity) -> Option<StoredRecord> {
        if let Some(doi) = identity.doi.as_deref() {
            if let Some(existing) = self.find_live_by_doi(doi).await {
                return Some(existing);
            }
        }

        let candidates = match self.destination.find_by_title(&identity.title).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, "Destination title query failed, assuming no duplicate");
                return None;
            }
        };

        for candidate in candidates {
            if candidate.archived {
                continue;
            }
            let similarity = title_similarity(&identity.title, &candidate.title);
            if similarity >= self.title_threshold {
                tracing::info!(
                    existing_id = %candidate.id,
                    similarity,
                    "Duplicate found by title similarity"
                );
                return Some(candidate);
            }
        }

        None
    }

    async fn find_live_by_doi(&self, doi: &str) -> Option<StoredRecord> {
        let normalized = normalize_doi(doi);
        if normalized.is_empty() {
            return None;
        }

        match self.destination.find_by_identifier(&normalized).await {
            Ok(Some(existing)) if !existing.archived => {
                tracing::info!(existing_id = %existing.id, doi = %normalized, "Duplicate found by identifier");
                Some(existing)
            }
            Ok(Some(existing)) => {
                tracing::debug!(existing_id = %existing.id, "Ignoring archived record");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Destination identifier query failed, assuming no duplicate");
                None
            }
        }
    }
}

impl std::fmt::Debug for DeduplicationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeduplicationResolver")
            .field("title_threshold", &self.title_threshold)
            .finish_non_exhaustive()
    }
}
