//! Per-file pipeline orchestration.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::PipelineError;
use crate::model::PaperIdentity;
use crate::resolve::{DeduplicationResolver, IdentityExtractor, RateLimiter, RegistrySearcher};
use crate::services::{NewRecord, PipelineEvent, Services};
use crate::storage::{mtime_of, ProcessedOutcome, ProcessedRecord, ProcessedRecordStore};
use crate::Result;

use super::mover::FileMover;
use super::PipelineStage;

/// Outcome of the fallible pipeline portion, before finalization.
enum PipelineResult {
    /// An existing destination record was found.
    Duplicate {
        identity: PaperIdentity,
        existing_id: String,
    },
    /// A new record was created.
    Complete {
        identity: PaperIdentity,
        destination_id: String,
    },
}

/// Sequences the per-file pipeline and records outcomes.
///
/// State machine per file:
/// `Detected -> Queued -> Resolving -> {DuplicateFound | Enriched} ->
/// Finalized(success|failure)`. Any unrecoverable error finalizes as a
/// per-file failure; the worker loop never sees it.
///
/// The resolution stage (metadata extraction plus registry search) runs
/// under a single-permit semaphore shared by every worker, capping
/// external-service concurrency at one regardless of pool size. Cheap
/// local checks and the extraction backends run outside the gate.
pub struct Orchestrator {
    services: Services,
    store: Arc<ProcessedRecordStore>,
    extractor: IdentityExtractor,
    searcher: RegistrySearcher,
    dedup: DeduplicationResolver,
    mover: FileMover,
    gate: Arc<Semaphore>,
    config: Config,
}

impl Orchestrator {
    /// Wire the pipeline from injected capability implementations.
    #[must_use]
    pub fn new(config: Config, services: Services, store: Arc<ProcessedRecordStore>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.registry.request_gap));
        let searcher = RegistrySearcher::new(
            Arc::clone(&services.registry),
            limiter,
            config.registry.clone(),
            config.matching.clone(),
        );
        let dedup = DeduplicationResolver::new(
            Arc::clone(&services.destination),
            config.matching.dedup_title_threshold,
        );
        let mover = FileMover::new(config.success_dir(), config.failed_dir());

        Self {
            services,
            store,
            extractor: IdentityExtractor::default(),
            searcher,
            dedup,
            mover,
            gate: Arc::new(Semaphore::new(1)),
            config,
        }
    }

    /// The resolution gate. Capacity 1 by construction; shared here so
    /// tests can observe that it is never exceeded.
    #[must_use]
    pub fn gate(&self) -> Arc<Semaphore> {
        Arc::clone(&self.gate)
    }

    /// Process one file end to end, always finalizing.
    ///
    /// Never returns an error: failures are downgraded to a per-file
    /// failure outcome with the file preserved in the failed area.
    pub async fn process_file(&self, path: &Path, worker_id: usize) -> ProcessedOutcome {
        let started = Instant::now();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        tracing::info!(worker = worker_id, file = %file_name, "Processing file");

        // Snapshot before any move so the ledger records the mtime the
        // file had while it sat in the watch directory.
        let mtime = mtime_of(path).unwrap_or(0);
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        match self.run_pipeline(path, &file_name).await {
            Ok(PipelineResult::Complete {
                identity,
                destination_id,
            }) => {
                let moved = self.mover.move_success(path, &destination_id);
                let mut record = ProcessedRecord::new(mtime, size, ProcessedOutcome::Success)
                    .with_destination_id(&destination_id);
                if let Some(moved) = &moved {
                    record = record.with_moved_to(moved.display().to_string());
                }
                self.record(path, record);

                tracing::info!(
                    worker = worker_id,
                    file = %file_name,
                    stage = %PipelineStage::Finalized,
                    destination_id = %destination_id,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "File finalized: success"
                );

                self.notify(PipelineEvent::Success {
                    identity,
                    destination_id,
                    elapsed: started.elapsed(),
                })
                .await;

                ProcessedOutcome::Success
            }
            Ok(PipelineResult::Duplicate {
                identity,
                existing_id,
            }) => {
                let moved = self.mover.move_success(path, &existing_id);
                let mut record = ProcessedRecord::new(mtime, size, ProcessedOutcome::Duplicate)
                    .with_destination_id(&existing_id);
                if let Some(moved) = &moved {
                    record = record.with_moved_to(moved.display().to_string());
                }
                self.record(path, record);

                tracing::info!(
                    worker = worker_id,
                    file = %file_name,
                    stage = %PipelineStage::Finalized,
                    existing_id = %existing_id,
                    "File finalized: duplicate"
                );

                self.notify(PipelineEvent::Duplicate {
                    identity,
                    existing_id,
                })
                .await;

                ProcessedOutcome::Duplicate
            }
            Err(e) => {
                let moved = self.mover.move_failed(path);
                let mut record = ProcessedRecord::new(mtime, size, ProcessedOutcome::Failure);
                if let Some(moved) = &moved {
                    record = record.with_moved_to(moved.display().to_string());
                }
                self.record(path, record);

                tracing::error!(
                    worker = worker_id,
                    file = %file_name,
                    stage = %PipelineStage::Finalized,
                    error = %e,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "File finalized: failure"
                );

                self.notify(PipelineEvent::Failure {
                    file_name,
                    error: e.to_string(),
                    elapsed: started.elapsed(),
                })
                .await;

                ProcessedOutcome::Failure
            }
        }
    }

    /// The fallible pipeline portion.
    async fn run_pipeline(&self, path: &Path, file_name: &str) -> Result<PipelineResult> {
        let text = self.extract_text(path, file_name).await?;

        // Cheap local check: a provisional identifier that already exists
        // in the destination store short-circuits before any registry
        // call is made.
        let provisional_doi = self.extractor.extract(&text);
        if let Some(doi) = provisional_doi.as_deref() {
            if let Some(existing) = self.dedup.check_provisional(doi).await {
                tracing::info!(
                    file = %file_name,
                    stage = %PipelineStage::DuplicateFound,
                    existing_id = %existing.id,
                    "Provisional identifier already ingested"
                );
                let identity = PaperIdentity::new(file_name).with_doi(doi);
                return Ok(PipelineResult::Duplicate {
                    identity,
                    existing_id: existing.id,
                });
            }
        }

        // Resolution stage: serialized across the whole pool.
        let mut identity = {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| crate::Error::internal("resolution gate closed"))?;

            tracing::debug!(file = %file_name, stage = %PipelineStage::Resolving, "Entering resolution stage");

            let mut identity = self
                .services
                .metadata
                .extract_identity(&text, file_name)
                .await?;

            if identity.doi.is_none() {
                identity.doi.clone_from(&provisional_doi);
            }

            if let Some(matched) = self.searcher.search_identifier(&identity).await {
                tracing::info!(
                    file = %file_name,
                    external_id = %matched.record.id,
                    strategy = matched.score.strategy,
                    total = matched.score.total,
                    "Registry match accepted"
                );
                identity.merge_registry(&matched.record);
            }

            identity
        };

        // Re-check against the destination store now that authoritative
        // fields are attached; catches files with no extractable
        // identifier up front.
        if let Some(existing) = self.dedup.check_enriched(&identity).await {
            tracing::info!(
                file = %file_name,
                stage = %PipelineStage::DuplicateFound,
                existing_id = %existing.id,
                "Enriched identity matches existing record"
            );
            return Ok(PipelineResult::Duplicate {
                identity,
                existing_id: existing.id,
            });
        }

        tracing::debug!(file = %file_name, stage = %PipelineStage::Enriched, "Enriching record");

        let summary = match self.services.summary.summarize(&text, &identity).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                tracing::warn!(file = %file_name, error = %e, "Summary generation failed, continuing without");
                None
            }
        };

        if identity.citation_count.is_none() {
            match self
                .services
                .citations
                .citation_count(identity.doi.as_deref(), Some(&identity.title))
                .await
            {
                Ok(count) => identity.citation_count = count,
                Err(e) => {
                    tracing::debug!(file = %file_name, error = %e, "Citation lookup failed");
                }
            }
        }

        let record = NewRecord {
            identity: identity.clone(),
            summary,
            source_file: file_name.to_string(),
        };

        let destination_id = self
            .services
            .destination
            .create(&record)
            .await
            .map_err(|e| PipelineError::Destination(e.to_string()))?;

        Ok(PipelineResult::Complete {
            identity,
            destination_id,
        })
    }

    /// Extract text with the quick attempt first, falling back to the
    /// thorough attempt when the quick one fails, times out, or yields
    /// too little text.
    async fn extract_text(&self, path: &Path, file_name: &str) -> Result<String> {
        let min_len = self.config.pipeline.min_text_len;

        let quick = tokio::time::timeout(
            self.config.pipeline.quick_extract_timeout,
            self.services.text.extract_quick(path),
        )
        .await;

        match quick {
            Ok(Ok(text)) if text.trim().len() >= min_len => return Ok(text),
            Ok(Ok(text)) => {
                tracing::warn!(
                    file = %file_name,
                    chars = text.trim().len(),
                    "Quick extraction came up short, falling back"
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(file = %file_name, error = %e, "Quick extraction failed, falling back");
            }
            Err(_) => {
                tracing::warn!(file = %file_name, "Quick extraction timed out, falling back");
            }
        }

        let thorough = tokio::time::timeout(
            self.config.pipeline.thorough_extract_timeout,
            self.services.text.extract_thorough(path),
        )
        .await;

        match thorough {
            Ok(Ok(text)) if text.trim().len() >= min_len => Ok(text),
            Ok(Ok(_)) => Err(PipelineError::UnrecoverableInput(format!(
                "extracted text below {min_len} characters"
            ))
            .into()),
            Ok(Err(e)) => Err(PipelineError::Extraction {
                file: file_name.to_string(),
                reason: e.to_string(),
            }
            .into()),
            Err(_) => Err(PipelineError::Extraction {
                file: file_name.to_string(),
                reason: "thorough extraction timed out".to_string(),
            }
            .into()),
        }
    }

    async fn notify(&self, event: PipelineEvent) {
        if let Err(e) = self.services.notifications.notify(&event).await {
            tracing::warn!(kind = event.kind(), error = %e, "Notification failed");
        }
    }

    fn record(&self, path: &Path, record: ProcessedRecord) {
        if let Err(e) = self.store.insert(path, record) {
            tracing::error!(path = %path.display(), error = %e, "Failed to update ledger");
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("workers", &self.config.pipeline.workers)
            .finish_non_exhaustive()
    }
}
