//! Bounded ingestion queue with drop-on-overflow backpressure.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

/// Outcome of one timed queue pop.
#[derive(Debug)]
pub enum PopOutcome {
    /// An item was dequeued.
    Item(PathBuf),
    /// The timeout elapsed; the caller should re-check shutdown.
    Timeout,
    /// The queue is closed and drained.
    Closed,
}

/// Producer half of the ingestion queue.
///
/// Enqueueing is non-blocking: when the queue is full the path is
/// dropped and logged, shedding load instead of stalling the watcher.
#[derive(Clone)]
pub struct IngestionQueue {
    tx: mpsc::Sender<PathBuf>,
    enqueued: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

/// Consumer half, shared by all workers.
#[derive(Clone)]
pub struct IngestionReceiver {
    rx: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
}

/// Create a bounded queue with the given capacity.
#[must_use]
pub fn bounded(capacity: usize) -> (IngestionQueue, IngestionReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));

    (
        IngestionQueue {
            tx,
            enqueued: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        },
        IngestionReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

impl IngestionQueue {
    /// Enqueue a path without blocking.
    ///
    /// Returns false when the path was dropped (queue full or closed).
    pub fn try_enqueue(&self, path: PathBuf) -> bool {
        match self.tx.try_send(path) {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(path)) => {
                tracing::warn!(
                    path = %path.display(),
                    "Ingestion queue full, dropping file"
                );
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(mpsc::error::TrySendError::Closed(path)) => {
                tracing::warn!(
                    path = %path.display(),
                    "Ingestion queue closed, dropping file"
                );
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Paths accepted so far.
    #[must_use]
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Paths dropped on overflow so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl IngestionReceiver {
    /// Pop with a bounded timeout.
    ///
    /// The timeout keeps workers responsive to shutdown even when the
    /// queue is idle.
    pub async fn pop_timeout(&self, timeout: Duration) -> PopOutcome {
        let mut rx = self.rx.lock().await;

        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(path)) => PopOutcome::Item(path),
            Ok(None) => PopOutcome::Closed,
            Err(_) => PopOutcome::Timeout,
        }
    }
}

impl std::fmt::Debug for IngestionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionQueue")
            .field("enqueued", &self.enqueued())
            .field("dropped", &self.dropped())
            .finish()
    }
}

impl std::fmt::Debug for IngestionReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionReceiver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_and_pop_fifo() {
        let (queue, receiver) = bounded(4);

        assert!(queue.try_enqueue(PathBuf::from("/inbox/a.pdf")));
        assert!(queue.try_enqueue(PathBuf::from("/inbox/b.pdf")));

        let first = receiver.pop_timeout(Duration::from_millis(50)).await;
        let second = receiver.pop_timeout(Duration::from_millis(50)).await;

        assert!(matches!(first, PopOutcome::Item(p) if p.ends_with("a.pdf")));
        assert!(matches!(second, PopOutcome::Item(p) if p.ends_with("b.pdf")));
    }

    #[tokio::test]
    async fn test_overflow_drops_and_counts() {
        let (queue, _receiver) = bounded(2);

        assert!(queue.try_enqueue(PathBuf::from("/a.pdf")));
        assert!(queue.try_enqueue(PathBuf::from("/b.pdf")));
        assert!(!queue.try_enqueue(PathBuf::from("/c.pdf")));

        assert_eq!(queue.enqueued(), 2);
        assert_eq!(queue.dropped(), 1);
    }

    #[tokio::test]
    async fn test_pop_times_out_on_empty_queue() {
        let (_queue, receiver) = bounded(2);

        let outcome = receiver.pop_timeout(Duration::from_millis(20)).await;
        assert!(matches!(outcome, PopOutcome::Timeout));
    }

    #[tokio::test]
    async fn test_pop_reports_closed_queue() {
        let (queue, receiver) = bounded(2);
        drop(queue);

        let outcome = receiver.pop_timeout(Duration::from_millis(20)).await;
        assert!(matches!(outcome, PopOutcome::Closed));
    }

    #[tokio::test]
    async fn test_shared_receiver_distributes_items() {
        let (queue, receiver) = bounded(8);
        for i in 0..4 {
            assert!(queue.try_enqueue(PathBuf::from(format!("/{i}.pdf"))));
        }

        let a = receiver.clone();
        let b = receiver.clone();
        let mut got = Vec::new();
        for _ in 0..2 {
            if let PopOutcome::Item(p) = a.pop_timeout(Duration::from_millis(50)).await {
                got.push(p);
            }
            if let PopOutcome::Item(p) = b.pop_timeout(Duration::from_millis(50)).await {
                got.push(p);
            }
        }

        assert_eq!(got.len(), 4);
    }
}
