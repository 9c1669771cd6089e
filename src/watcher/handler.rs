//! Detection routing: filter, stability gate, debounce, ledger check.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::WatchConfig;
use crate::storage::ProcessedRecordStore;

use super::debounce::DebounceLedger;
use super::filter::{FileFilter, FilterVerdict};
use super::stability::{is_file_ready, PendingSet};

/// Callback invoked with each path that survives every gate.
///
/// Side effect only: the watcher never processes the file itself.
pub type DetectionCallback = Arc<dyn Fn(PathBuf) + Send + Sync>;

/// Statistics for file detection.
#[derive(Debug, Default)]
pub struct WatcherStats {
    pub files_seen: AtomicU64,
    pub files_filtered: AtomicU64,
    pub files_debounced: AtomicU64,
    pub files_pending: AtomicU64,
    pub files_already_processed: AtomicU64,
    pub files_emitted: AtomicU64,
}

impl WatcherStats {
    /// Create a new stats tracker.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Get a snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            files_filtered: self.files_filtered.load(Ordering::Relaxed),
            files_debounced: self.files_debounced.load(Ordering::Relaxed),
            files_pending: self.files_pending.load(Ordering::Relaxed),
            files_already_processed: self.files_already_processed.load(Ordering::Relaxed),
            files_emitted: self.files_emitted.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of watcher stats.
#[derive(Debug, Clone, Copy)]
pub struct WatcherStatsSnapshot {
    pub files_seen: u64,
    pub files_filtered: u64,
    pub files_debounced: u64,
    pub files_pending: u64,
    pub files_already_processed: u64,
    pub files_emitted: u64,
}

/// Routes detected paths through the gates and into the callback.
pub struct DetectionHandler {
    filter: FileFilter,
    debounce: DebounceLedger,
    pending: PendingSet,
    store: Arc<ProcessedRecordStore>,
    callback: DetectionCallback,
    stats: Arc<WatcherStats>,
}

impl DetectionHandler {
    /// Build a handler from the watcher configuration.
    #[must_use]
    pub fn new(
        config: &WatchConfig,
        store: Arc<ProcessedRecordStore>,
        callback: DetectionCallback,
        stats: Arc<WatcherStats>,
    ) -> Self {
        Self {
            filter: FileFilter::new(config),
            debounce: DebounceLedger::new(config.debounce_window, config.debounce_purge_after),
            pending: PendingSet::new(config.stability_poll, config.stability_timeout),
            store,
            callback,
            stats,
        }
    }

    /// Route one detected path through every gate.
    pub fn handle_event(&self, path: &Path) {
        self.stats.files_seen.fetch_add(1, Ordering::Relaxed);

        match self.filter.check(path) {
            FilterVerdict::Accept => {}
            FilterVerdict::TooLarge => {
                tracing::warn!(path = %path.display(), "File exceeds size ceiling, skipping");
                self.stats.files_filtered.fetch_add(1, Ordering::Relaxed);
                return;
            }
            verdict => {
                tracing::debug!(path = %path.display(), ?verdict, "File filtered out");
                self.stats.files_filtered.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        if !is_file_ready(path) {
            self.pending.add(path);
            self.stats.files_pending.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if !self.debounce.should_emit(path) {
            self.stats.files_debounced.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.emit(path);
    }

    /// Re-probe the pending set and emit files that became readable.
    pub fn poll_pending(&self) {
        for path in self.pending.drain_ready() {
            tracing::info!(path = %path.display(), "Pending file became readable");
            if self.debounce.should_emit(&path) {
                self.emit(&path);
            } else {
                self.stats.files_debounced.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Final ledger check, then hand the path to the callback.
    fn emit(&self, path: &Path) {
        if self.store.is_processed(path) {
            tracing::debug!(path = %path.display(), "Already processed, skipping");
            self.stats
                .files_already_processed
                .fetch_add(1, Ordering::Relaxed);
            return;
        }

        tracing::info!(path = %path.display(), "New file detected");
        self.stats.files_emitted.fetch_add(1, Ordering::Relaxed);
        (self.callback)(path.to_path_buf());
    }

    /// Current stats handle.
    #[must_use]
    pub fn stats(&self) -> Arc<WatcherStats> {
        Arc::clone(&self.stats)
    }

    /// Number of files waiting on stability.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

impl std::fmt::Debug for DetectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionHandler")
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
