//! Process composition: wires the watcher, queue, and worker pool.
//!
//! Capability implementations are constructed by the embedding process
//! and injected here once; nothing in the pipeline reaches for global
//! state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::pipeline::{self, Orchestrator, PipelineStage, WorkerPool};
use crate::services::Services;
use crate::storage::ProcessedRecordStore;
use crate::watcher::{
    scan_existing, DetectionCallback, DetectionHandler, DirectoryWatcher, WatcherStats,
};
use crate::Result;

/// Run the ingestion pipeline until `cancel` fires.
///
/// Subscribes to the watch directory, reconciles existing files against
/// the ledger, then processes detected files with the configured worker
/// pool. In-flight files finish before shutdown completes.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the ledger cannot be
/// opened, or the watch directory cannot be subscribed.
pub async fn run(config: Config, services: Services, cancel: CancellationToken) -> Result<()> {
    config.validate()?;

    let store = Arc::new(ProcessedRecordStore::open(&config.ledger_path)?);
    let (queue, receiver) = pipeline::bounded(config.pipeline.queue_capacity());

    let orchestrator = Arc::new(Orchestrator::new(
        config.clone(),
        services,
        Arc::clone(&store),
    ));

    // Queue admission is the Detected -> Queued edge; overflow is shed
    // inside the queue with a warning.
    let callback: DetectionCallback = Arc::new(move |path| {
        if queue.try_enqueue(path.clone()) {
            tracing::debug!(path = %path.display(), stage = %PipelineStage::Queued, "File queued");
        }
    });

    let handler = Arc::new(DetectionHandler::new(
        &config.watch,
        Arc::clone(&store),
        callback,
        WatcherStats::new(),
    ));

    // Subscribe before scanning so nothing lands unseen in between.
    let watcher = DirectoryWatcher::new(&config.watch_dir, &config.watch, Arc::clone(&handler))?;
    scan_existing(&config.watch_dir, &handler);

    let pool = WorkerPool::spawn(&config.pipeline, &receiver, orchestrator, &cancel);
    let watcher_task = tokio::spawn(watcher.run(cancel.clone()));

    tracing::info!(
        watch_dir = %config.watch_dir.display(),
        workers = config.pipeline.workers,
        "Pipeline running"
    );

    pool.join().await;
    if let Err(e) = watcher_task.await {
        tracing::error!(error = %e, "Watcher task failed");
    }

    tracing::info!("Pipeline stopped");
    Ok(())
}
