//! Filesystem subscription for the watch directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::WatchConfig;
use crate::error::WatcherError;
use crate::Result;

use super::handler::DetectionHandler;

/// Recursive watcher over the inbox directory.
///
/// OS events are coalesced by the debouncer, forwarded into an async
/// channel, and routed through the [`DetectionHandler`] gates. A fixed
/// interval re-probes the pending set for files that were mid-write
/// when first seen.
pub struct DirectoryWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    event_rx: mpsc::Receiver<Vec<PathBuf>>,
    handler: Arc<DetectionHandler>,
    poll_interval: Duration,
}

impl DirectoryWatcher {
    /// Subscribe to `root`, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or watched.
    pub fn new(
        root: &Path,
        config: &WatchConfig,
        handler: Arc<DetectionHandler>,
    ) -> Result<Self> {
        std::fs::create_dir_all(root)?;

        let (event_tx, event_rx) = mpsc::channel(100);

        let mut debouncer = new_debouncer(
            config.event_coalesce,
            move |result: std::result::Result<
                Vec<notify_debouncer_mini::DebouncedEvent>,
                notify::Error,
            >| {
                match result {
                    Ok(events) => {
                        let paths: Vec<PathBuf> = events
                            .into_iter()
                            .filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                            .map(|e| e.path)
                            .collect();

                        if !paths.is_empty() {
                            let _ = event_tx.blocking_send(paths);
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Watch error");
                    }
                }
            },
        )
        .map_err(|e| WatcherError::WatchFailed {
            path: root.display().to_string(),
            reason: e.to_string(),
        })?;

        debouncer
            .watcher()
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatcherError::WatchFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %root.display(), "Watching directory");

        Ok(Self {
            _debouncer: debouncer,
            event_rx,
            handler,
            poll_interval: config.stability_poll,
        })
    }

    /// Run the event loop until cancellation.
    ///
    /// In-flight work is allowed to finish; the loop only checks the
    /// token between events.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Watcher shutting down");
                    break;
                }
                Some(paths) = self.event_rx.recv() => {
                    for path in paths {
                        self.handler.handle_event(&path);
                    }
                }
                _ = poll.tick() => {
                    self.handler.poll_pending();
                }
            }
        }
    }
}

impl std::fmt::Debug for DirectoryWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWatcher")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
