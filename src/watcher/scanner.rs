//! Startup reconciliation scan.
//!
//! One full recursive walk of the watch directory, routing every file
//! through the same detection gates as live events. Files already in
//! the ledger with an unchanged mtime are skipped there; everything
//! else is enqueued, reconciling state after downtime.

use std::path::Path;

use walkdir::WalkDir;

use super::handler::DetectionHandler;

/// Result of one reconciliation scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanSummary {
    /// Files encountered during the walk.
    pub files_found: u64,
    /// Walk errors (unreadable directories and the like).
    pub errors: u64,
}

/// Walk `root` recursively and route every file through `handler`.
pub fn scan_existing(root: &Path, handler: &DetectionHandler) -> ScanSummary {
    let mut summary = ScanSummary::default();

    tracing::info!(path = %root.display(), "Starting reconciliation scan");

    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_dir() {
                    continue;
                }
                summary.files_found += 1;
                handler.handle_event(entry.path());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error walking watch directory");
                summary.errors += 1;
            }
        }
    }

    let stats = handler.stats().snapshot();
    tracing::info!(
        path = %root.display(),
        found = summary.files_found,
        emitted = stats.files_emitted,
        already_processed = stats.files_already_processed,
        filtered = stats.files_filtered,
        errors = summary.errors,
        "Reconciliation scan complete"
    );

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WatchConfig;
    use crate::storage::{mtime_of, ProcessedOutcome, ProcessedRecord, ProcessedRecordStore};
    use crate::watcher::handler::{DetectionCallback, WatcherStats};
    use parking_lot::Mutex;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn scan_setup(
        tmp: &TempDir,
    ) -> (
        Arc<ProcessedRecordStore>,
        DetectionHandler,
        Arc<Mutex<Vec<PathBuf>>>,
    ) {
        let store =
            Arc::new(ProcessedRecordStore::open(tmp.path().join("ledger.json")).unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let callback: DetectionCallback = Arc::new(move |path| {
            seen_clone.lock().push(path);
        });
        let handler = DetectionHandler::new(
            &WatchConfig::default(),
            Arc::clone(&store),
            callback,
            WatcherStats::new(),
        );
        (store, handler, seen)
    }

    #[test]
    fn test_scan_finds_unprocessed_files() {
        let tmp = TempDir::new().unwrap();
        let inbox = tmp.path().join("inbox");
        let nested = inbox.join("2024");
        fs::create_dir_all(&nested).unwrap();

        fs::write(inbox.join("a.pdf"), b"%PDF-1.7").unwrap();
        fs::write(nested.join("b.pdf"), b"%PDF-1.7").unwrap();
        fs::write(inbox.join("notes.txt"), b"not a pdf").unwrap();

        let (_store, handler, seen) = scan_setup(&tmp);
        let summary = scan_existing(&inbox, &handler);

        assert_eq!(summary.files_found, 3);
        let emitted = seen.lock();
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().any(|p| p.ends_with("a.pdf")));
        assert!(emitted.iter().any(|p| p.ends_with("b.pdf")));
    }

    #[test]
    fn test_scan_skips_files_current_in_ledger() {
        let tmp = TempDir::new().unwrap();
        let inbox = tmp.path().join("inbox");
        fs::create_dir_all(&inbox).unwrap();

        let done = inbox.join("done.pdf");
        let fresh = inbox.join("fresh.pdf");
        fs::write(&done, b"%PDF-1.7").unwrap();
        fs::write(&fresh, b"%PDF-1.7").unwrap();

        let (store, handler, seen) = scan_setup(&tmp);
        store
            .insert(
                &done,
                ProcessedRecord::new(mtime_of(&done).unwrap(), 8, ProcessedOutcome::Success),
            )
            .unwrap();

        scan_existing(&inbox, &handler);

        let emitted = seen.lock();
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].ends_with("fresh.pdf"));
    }

    #[test]
    fn test_scan_reprocesses_on_mtime_drift() {
        let tmp = TempDir::new().unwrap();
        let inbox = tmp.path().join("inbox");
        fs::create_dir_all(&inbox).unwrap();

        let changed = inbox.join("changed.pdf");
        fs::write(&changed, b"%PDF-1.7").unwrap();

        let (store, handler, seen) = scan_setup(&tmp);
        // Ledger entry carries an mtime far in the past.
        store
            .insert(
                &changed,
                ProcessedRecord::new(1_000, 8, ProcessedOutcome::Success),
            )
            .unwrap();

        scan_existing(&inbox, &handler);

        assert_eq!(seen.lock().len(), 1);
    }

    #[test]
    fn test_scan_of_empty_directory() {
        let tmp = TempDir::new().unwrap();
        let inbox = tmp.path().join("inbox");
        fs::create_dir_all(&inbox).unwrap();

        let (_store, handler, seen) = scan_setup(&tmp);
        let summary = scan_existing(&inbox, &handler);

        assert_eq!(summary.files_found, 0);
        assert!(seen.lock().is_empty());
    }
}
