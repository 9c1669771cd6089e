//! Worker pool pulling from the ingestion queue.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::PipelineConfig;

use super::orchestrator::Orchestrator;
use super::queue::{IngestionReceiver, PopOutcome};

/// Pool of N workers sharing one queue and one resolution gate.
///
/// Workers pop with a bounded timeout so the cancellation token is
/// observed promptly even when the queue is idle. A per-item failure is
/// absorbed by the orchestrator; nothing terminates the worker loop
/// except shutdown or queue closure.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the configured number of workers.
    #[must_use]
    pub fn spawn(
        config: &PipelineConfig,
        receiver: &IngestionReceiver,
        orchestrator: Arc<Orchestrator>,
        cancel: &CancellationToken,
    ) -> Self {
        let handles = (0..config.workers)
            .map(|id| {
                let receiver = receiver.clone();
                let orchestrator = Arc::clone(&orchestrator);
                let cancel = cancel.clone();
                let pop_timeout = config.pop_timeout;
                let pause = config.inter_item_pause;

                tokio::spawn(async move {
                    worker_loop(id, receiver, orchestrator, cancel, pop_timeout, pause).await;
                })
            })
            .collect();

        tracing::info!(workers = config.workers, "Worker pool started");

        Self { handles }
    }

    /// Wait for every worker to stop.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.handles.len())
            .finish()
    }
}

async fn worker_loop(
    id: usize,
    receiver: IngestionReceiver,
    orchestrator: Arc<Orchestrator>,
    cancel: CancellationToken,
    pop_timeout: std::time::Duration,
    pause: std::time::Duration,
) {
    tracing::info!(worker = id, "Worker started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match receiver.pop_timeout(pop_timeout).await {
            PopOutcome::Timeout => {}
            PopOutcome::Closed => {
                tracing::info!(worker = id, "Queue closed");
                break;
            }
            PopOutcome::Item(path) => {
                let _outcome = orchestrator.process_file(&path, id).await;

                // Inter-item pause, interruptible by shutdown.
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(pause) => {}
                }
            }
        }
    }

    tracing::info!(worker = id, "Worker stopped");
}
