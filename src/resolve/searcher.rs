//! Ordered multi-strategy lookup against the external registry.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::{MatchConfig, RegistryConfig};
use crate::model::PaperIdentity;
use crate::services::RegistryClient;

use super::rate_limit::RateLimiter;
use super::strategy::{SearchStrategy, STRATEGIES};
use super::validator::{MatchValidator, ValidatedMatch};

/// Upper bound on retry backoff jitter.
const MAX_JITTER: Duration = Duration::from_millis(250);

/// Runs the ordered strategy table against the registry, stopping at the
/// first candidate the validator accepts.
///
/// Rejected candidates are never surfaced; exhausting every strategy is
/// a normal `None`, not an error.
pub struct RegistrySearcher {
    client: Arc<dyn RegistryClient>,
    validator: MatchValidator,
    limiter: Arc<RateLimiter>,
    config: RegistryConfig,
    strategies: &'static [SearchStrategy],
}

impl RegistrySearcher {
    /// Create a searcher over the default strategy table.
    ///
    /// The rate limiter is injected (and shared with the validator) so
    /// one limiter governs every registry call in the process.
    #[must_use]
    pub fn new(
        client: Arc<dyn RegistryClient>,
        limiter: Arc<RateLimiter>,
        config: RegistryConfig,
        matching: MatchConfig,
    ) -> Self {
        let validator = MatchValidator::new(Arc::clone(&client), Arc::clone(&limiter), matching);
        Self {
            client,
            validator,
            limiter,
            config,
            strategies: STRATEGIES,
        }
    }

    /// Resolve `identity` to a validated registry match.
    ///
    /// Strategies run tightest-first; within each, every query phrasing
    /// is tried and every hit is validated before acceptance. Returns
    /// `None` when all strategies are exhausted.
    pub async fn search_identifier(&self, identity: &PaperIdentity) -> Option<ValidatedMatch> {
        for strategy in self.strategies {
            let queries = strategy.queries(identity);
            if queries.is_empty() {
                tracing::debug!(strategy = strategy.name, "Strategy skipped, missing fields");
                continue;
            }

            for query in &queries {
                self.limiter.acquire().await;
                let hits = self.search_with_retry(query).await;

                for hit in hits.iter().take(self.config.max_hits_per_query) {
                    if let Some(matched) =
                        self.validator.validate(hit, identity, strategy).await
                    {
                        return Some(matched);
                    }
                }
            }
        }

        tracing::info!(title = %identity.title, "No validated registry match");
        None
    }

    /// Run one query with bounded retries on retryable errors.
    ///
    /// Exponential backoff with jitter; a non-retryable error or retry
    /// exhaustion yields an empty hit list so the caller moves on to the
    /// next phrasing or strategy.
    async fn search_with_retry(&self, query: &str) -> Vec<String> {
        let mut attempt: u32 = 0;

        loop {
            match self.client.search(query).await {
                Ok(hits) => return hits,
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = self
                        .config
                        .retry_base_delay
                        .saturating_mul(1 << (attempt - 1))
                        + jitter();
                    tracing::warn!(
                        query,
                        attempt,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Registry query failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    tracing::warn!(query, error = %e, "Registry query failed, moving on");
                    return Vec::new();
                }
            }
        }
    }
}

impl std::fmt::Debug for RegistrySearcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrySearcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn jitter() -> Duration {
    let millis = rand::thread_rng().gen_range(0..MAX_JITTER.as_millis() as u64);
    Duration::from_millis(millis)
}
