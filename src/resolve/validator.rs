//! Weighted similarity validation of registry match candidates.

use std::sync::Arc;

use crate::config::MatchConfig;
use crate::model::{MatchScore, PaperIdentity, RegistryRecord};
use crate::services::RegistryClient;

use super::rate_limit::RateLimiter;
use super::similarity::{surname_overlap, title_similarity, year_closeness};
use super::strategy::{SearchStrategy, StrategyKind};

/// A candidate that cleared validation, with its fetched record.
#[derive(Debug, Clone)]
pub struct ValidatedMatch {
    /// Full registry record for the accepted identifier.
    pub record: RegistryRecord,
    /// The score that accepted it.
    pub score: MatchScore,
}

/// Scores candidate matches against the source identity and accepts or
/// rejects them by strategy class.
///
/// Any lookup failure is a rejection: a candidate we cannot verify is
/// never returned.
pub struct MatchValidator {
    client: Arc<dyn RegistryClient>,
    limiter: Arc<RateLimiter>,
    config: MatchConfig,
}

impl MatchValidator {
    /// Create a validator sharing the searcher's client and limiter.
    #[must_use]
    pub fn new(
        client: Arc<dyn RegistryClient>,
        limiter: Arc<RateLimiter>,
        config: MatchConfig,
    ) -> Self {
        Self {
            client,
            limiter,
            config,
        }
    }

    /// The accept threshold for a strategy class.
    #[must_use]
    pub const fn threshold_for(&self, kind: StrategyKind) -> f64 {
        match kind {
            StrategyKind::Identifier => self.config.identifier_threshold,
            StrategyKind::Heuristic => self.config.heuristic_threshold,
        }
    }

    /// Compute the weighted score of `record` against `source`.
    ///
    /// Raising any sub-similarity while the others hold never lowers the
    /// total: each component is a non-negative weight times a similarity
    /// in `0..=1`.
    #[must_use]
    pub fn score(
        &self,
        source: &PaperIdentity,
        record: &RegistryRecord,
        strategy: &SearchStrategy,
    ) -> MatchScore {
        let title_score = title_similarity(&source.title, &record.title) * self.config.title_weight;
        let author_score = surname_overlap(&source.authors, &record.authors, self.config.max_authors)
            * self.config.author_weight;
        let year_score = year_closeness(source.year, record.year) * self.config.year_weight;

        MatchScore::new(
            title_score,
            author_score,
            year_score,
            self.threshold_for(strategy.kind),
            strategy.name,
        )
    }

    /// Fetch the full record for `external_id` and accept it iff its
    /// weighted score clears the strategy-class threshold.
    ///
    /// Returns `None` on rejection and on any lookup failure.
    pub async fn validate(
        &self,
        external_id: &str,
        source: &PaperIdentity,
        strategy: &SearchStrategy,
    ) -> Option<ValidatedMatch> {
        self.limiter.acquire().await;

        let record = match self.client.fetch(external_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::debug!(external_id, "Candidate has no registry record");
                return None;
            }
            Err(e) => {
                tracing::warn!(external_id, error = %e, "Candidate fetch failed, rejecting");
                return None;
            }
        };

        let score = self.score(source, &record, strategy);

        if score.accepted() {
            tracing::info!(
                external_id,
                strategy = strategy.name,
                total = score.total,
                threshold = score.threshold,
                "Match accepted"
            );
            Some(ValidatedMatch { record, score })
        } else {
            tracing::debug!(
                external_id,
                strategy = strategy.name,
                title = score.title_score,
                author = score.author_score,
                year = score.year_score,
                total = score.total,
                threshold = score.threshold,
                "Match rejected"
            );
            None
        }
    }
}

impl std::fmt::Debug for MatchValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchValidator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolveError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StubRegistry {
        record: Option<RegistryRecord>,
        fail: bool,
    }

    #[async_trait]
    impl RegistryClient for StubRegistry {
        async fn search(&self, _query: &str) -> Result<Vec<String>, ResolveError> {
            Ok(Vec::new())
        }

        async fn fetch(&self, _id: &str) -> Result<Option<RegistryRecord>, ResolveError> {
            if self.fail {
                Err(ResolveError::Transient("connection reset".to_string()))
            } else {
                Ok(self.record.clone())
            }
        }
    }

    fn validator_with(record: Option<RegistryRecord>, fail: bool) -> MatchValidator {
        MatchValidator::new(
            Arc::new(StubRegistry { record, fail }),
            Arc::new(RateLimiter::new(Duration::ZERO)),
            MatchConfig::default(),
        )
    }

    fn source_identity() -> PaperIdentity {
        PaperIdentity::new("Sleep and the consolidation of episodic memory")
            .with_authors(vec!["Tanaka, Yuki".to_string(), "Brown, Alice".to_string()])
            .with_year(2022)
    }

    fn matching_record() -> RegistryRecord {
        RegistryRecord {
            id: "R1".to_string(),
            title: "Sleep and the consolidation of episodic memory".to_string(),
            authors: vec!["Tanaka, Y".to_string(), "Brown, A".to_string()],
            year: Some(2022),
            ..RegistryRecord::default()
        }
    }

    fn heuristic_strategy() -> &'static SearchStrategy {
        &super::super::strategy::STRATEGIES[1]
    }

    fn identifier_strategy() -> &'static SearchStrategy {
        &super::super::strategy::STRATEGIES[0]
    }

    #[tokio::test]
    async fn test_validate_accepts_exact_match() {
        let validator = validator_with(Some(matching_record()), false);
        let result = validator
            .validate("R1", &source_identity(), heuristic_strategy())
            .await;

        let matched = result.expect("exact match should validate");
        assert!((matched.score.total - 100.0).abs() < 1e-9);
        assert_eq!(matched.record.id, "R1");
    }

    #[tokio::test]
    async fn test_validate_rejects_unrelated_record() {
        let unrelated = RegistryRecord {
            id: "R2".to_string(),
            title: "Deep learning for protein structure prediction".to_string(),
            authors: vec!["Garcia, M".to_string()],
            year: Some(2018),
            ..RegistryRecord::default()
        };
        let validator = validator_with(Some(unrelated), false);

        let result = validator
            .validate("R2", &source_identity(), heuristic_strategy())
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_validate_fails_closed_on_lookup_error() {
        let validator = validator_with(None, true);
        let result = validator
            .validate("R1", &source_identity(), heuristic_strategy())
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_validate_rejects_missing_record() {
        let validator = validator_with(None, false);
        let result = validator
            .validate("R1", &source_identity(), heuristic_strategy())
            .await;
        assert!(result.is_none());
    }

    #[test]
    fn test_score_monotonic_in_title_similarity() {
        let validator = validator_with(None, false);
        let source = source_identity();

        let half_title = RegistryRecord {
            title: "Sleep consolidation in rodents and humans observed".to_string(),
            ..matching_record()
        };
        let full_title = matching_record();

        let lower = validator.score(&source, &half_title, heuristic_strategy());
        let higher = validator.score(&source, &full_title, heuristic_strategy());

        assert!(lower.title_score < higher.title_score);
        assert!(lower.total < higher.total);
        // Author and year components unchanged.
        assert!((lower.author_score - higher.author_score).abs() < f64::EPSILON);
        assert!((lower.year_score - higher.year_score).abs() < f64::EPSILON);
    }

    #[test]
    fn test_same_score_splits_on_strategy_class() {
        let validator = validator_with(None, false);
        let source = source_identity();

        // Title Jaccard 0.75 (45), full author credit (30), year off by
        // one (5): exactly 80 points, which clears the identifier bar
        // but not the heuristic one.
        let record = RegistryRecord {
            title: "Sleep and the consolidation of memory".to_string(),
            year: Some(2021),
            ..matching_record()
        };

        let as_identifier = validator.score(&source, &record, identifier_strategy());
        let as_heuristic = validator.score(&source, &record, heuristic_strategy());

        assert!((as_identifier.total - as_heuristic.total).abs() < f64::EPSILON);
        assert!((as_identifier.total - 80.0).abs() < 1e-9);
        assert!(as_identifier.accepted());
        assert!(!as_heuristic.accepted());
    }
}
