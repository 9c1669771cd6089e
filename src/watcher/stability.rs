//! Write-stability gate for freshly detected files.
//!
//! A file that appears in the watch directory may still be mid-copy.
//! The gate probes readability; files that fail the probe sit in a
//! pending set that is re-checked on a fixed interval and abandoned
//! after an absolute timeout.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// How much of the file the readiness probe reads.
const PROBE_BYTES: usize = 1024;

/// A detected file awaiting stability.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// Path as detected.
    pub path: PathBuf,
    /// When the file first failed the probe.
    pub detected_at: Instant,
    /// Size observed at detection time.
    pub size: u64,
}

/// Probe whether a file is fully written and readable.
///
/// Opens the file and reads its head; a file still being written (or
/// locked by the writer) fails the probe.
#[must_use]
pub fn is_file_ready(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut probe = Vec::with_capacity(PROBE_BYTES);
    file.take(PROBE_BYTES as u64).read_to_end(&mut probe).is_ok()
}

/// Pending set of files that failed the stability probe.
#[derive(Debug)]
pub struct PendingSet {
    recheck_after: Duration,
    timeout: Duration,
    pending: Mutex<HashMap<PathBuf, CandidateFile>>,
}

impl PendingSet {
    /// Create a pending set.
    ///
    /// Files are re-probed once they have waited `recheck_after` and
    /// dropped with a warning once they have waited `timeout`.
    #[must_use]
    pub fn new(recheck_after: Duration, timeout: Duration) -> Self {
        Self {
            recheck_after,
            timeout,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Add a file to the pending set (idempotent per path).
    pub fn add(&self, path: &Path) {
        let mut pending = self.pending.lock();
        pending.entry(path.to_path_buf()).or_insert_with(|| {
            tracing::debug!(path = %path.display(), "File not ready, added to pending set");
            CandidateFile {
                path: path.to_path_buf(),
                detected_at: Instant::now(),
                size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
            }
        });
    }

    /// Re-probe waiting files.
    ///
    /// Returns the paths that became ready; times out and discards the
    /// rest once they exceed the absolute cap.
    pub fn drain_ready(&self) -> Vec<PathBuf> {
        let now = Instant::now();
        let mut ready = Vec::new();

        let mut pending = self.pending.lock();
        pending.retain(|path, candidate| {
            let waited = now.duration_since(candidate.detected_at);

            if waited < self.recheck_after {
                return true;
            }

            if is_file_ready(path) {
                ready.push(path.clone());
                return false;
            }

            if waited >= self.timeout {
                tracing::warn!(
                    path = %path.display(),
                    waited_secs = waited.as_secs(),
                    "File never became readable, dropping"
                );
                return false;
            }

            true
        });

        ready
    }

    /// Number of files waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether no files are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Whether `path` is waiting.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.pending.lock().contains_key(path)
    }
}
