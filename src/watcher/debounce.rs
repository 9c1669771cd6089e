//! Per-path suppression of duplicate filesystem notifications.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Suppresses repeat events for one path inside a time window.
///
/// Keys are resolved absolute paths so the same file reached through
/// different spellings debounces together. Entries old enough to be
/// irrelevant are purged lazily on each lookup.
#[derive(Debug)]
pub struct DebounceLedger {
    window: Duration,
    purge_after: Duration,
    seen: Mutex<HashMap<PathBuf, Instant>>,
}

impl DebounceLedger {
    /// Create a ledger with the given suppression window and purge age.
    #[must_use]
    pub fn new(window: Duration, purge_after: Duration) -> Self {
        Self {
            window,
            purge_after,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Whether an event for `path` should be emitted now.
    ///
    /// The first call for a path inside any window returns true and
    /// records the moment; subsequent calls within the window return
    /// false. Returns to true once the window has passed.
    #[must_use]
    pub fn should_emit(&self, path: &Path) -> bool {
        let key = resolve_key(path);
        let now = Instant::now();

        let mut seen = self.seen.lock();

        // Lazy purge of entries too old to matter.
        let purge_after = self.purge_after;
        seen.retain(|_, at| now.duration_since(*at) <= purge_after);

        if let Some(last) = seen.get(&key) {
            if now.duration_since(*last) < self.window {
                tracing::debug!(path = %key.display(), "Duplicate event suppressed");
                return false;
            }
        }

        seen.insert(key, now);
        true
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// Whether the ledger has no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }
}

/// Resolve a path to its debounce key.
fn resolve_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_first_event_emits() {
        let ledger = DebounceLedger::new(Duration::from_secs(30), Duration::from_secs(3600));
        assert!(ledger.should_emit(Path::new("/inbox/a.pdf")));
    }

    #[test]
    fn test_repeat_event_within_window_suppressed() {
        let ledger = DebounceLedger::new(Duration::from_secs(30), Duration::from_secs(3600));
        let path = Path::new("/inbox/a.pdf");

        assert!(ledger.should_emit(path));
        assert!(!ledger.should_emit(path));
        assert!(!ledger.should_emit(path));
    }

    #[test]
    fn test_distinct_paths_do_not_interfere() {
        let ledger = DebounceLedger::new(Duration::from_secs(30), Duration::from_secs(3600));

        assert!(ledger.should_emit(Path::new("/inbox/a.pdf")));
        assert!(ledger.should_emit(Path::new("/inbox/b.pdf")));
    }

    #[test]
    fn test_event_emits_again_after_window() {
        let ledger = DebounceLedger::new(Duration::ZERO, Duration::from_secs(3600));
        let path = Path::new("/inbox/a.pdf");

        assert!(ledger.should_emit(path));
        // Zero window: the next event is already outside it.
        assert!(ledger.should_emit(path));
    }

    #[test]
    fn test_old_entries_are_purged() {
        let ledger = DebounceLedger::new(Duration::ZERO, Duration::ZERO);
        assert!(ledger.should_emit(Path::new("/inbox/a.pdf")));
        assert_eq!(ledger.len(), 1);

        std::thread::sleep(Duration::from_millis(5));

        // The previous entry ages out during the next lookup.
        assert!(ledger.should_emit(Path::new("/inbox/b.pdf")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_path_spellings_share_one_key() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        let ledger = DebounceLedger::new(Duration::from_secs(30), Duration::from_secs(3600));
        let dotted = tmp.path().join(".").join("paper.pdf");

        assert!(ledger.should_emit(&file));
        assert!(!ledger.should_emit(&dotted));
    }
}
