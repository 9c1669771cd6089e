//! The processed-record ledger: one JSON document, one entry per path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use parking_lot::Mutex;

use super::models::{ProcessedOutcome, ProcessedRecord};
use crate::error::StorageError;
use crate::Result;

/// Mtime drift tolerated before a path counts as new content, seconds.
const MTIME_TOLERANCE_SECS: i64 = 1;

/// Durable map of normalized path to last processing outcome.
///
/// Single-writer-per-process by design: every mutation rewrites the
/// whole document under an in-process lock. A clustered deployment
/// would need a transactional store instead.
pub struct ProcessedRecordStore {
    path: PathBuf,
    records: Mutex<HashMap<String, ProcessedRecord>>,
}

impl ProcessedRecordStore {
    /// Open the ledger at `path`, creating an empty one if absent.
    ///
    /// An unparseable document is logged and replaced with an empty
    /// ledger rather than refusing to start; affected files are simply
    /// reprocessed.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing document cannot be read.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let records = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| StorageError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

            match serde_json::from_str::<HashMap<String, ProcessedRecord>>(&raw) {
                Ok(records) => {
                    tracing::info!(
                        path = %path.display(),
                        entries = records.len(),
                        "Loaded processed-record ledger"
                    );
                    records
                }
                Err(e) => {
                    tracing::error!(
                        path = %path.display(),
                        error = %e,
                        "Ledger document unparseable, starting empty"
                    );
                    HashMap::new()
                }
            }
        } else {
            tracing::info!(path = %path.display(), "Creating new processed-record ledger");
            HashMap::new()
        };

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Whether `path` was already processed with unchanged content.
    ///
    /// Compares the stored mtime against the file's current mtime with a
    /// one-second tolerance; larger drift means changed content and the
    /// path is treated as new.
    #[must_use]
    pub fn is_processed(&self, path: &Path) -> bool {
        let key = Self::normalize(path);

        let stored_mtime = {
            let records = self.records.lock();
            match records.get(&key) {
                Some(record) => record.mtime,
                None => return false,
            }
        };

        match mtime_of(path) {
            Some(current) => (current - stored_mtime).abs() <= MTIME_TOLERANCE_SECS,
            None => {
                tracing::debug!(path = %path.display(), "Cannot stat file for ledger check");
                false
            }
        }
    }

    /// Insert (or re-enter) the record for `path` and persist the
    /// document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn insert(&self, path: &Path, record: ProcessedRecord) -> Result<()> {
        let key = Self::normalize(path);

        let mut records = self.records.lock();
        records.insert(key, record);
        self.save_locked(&records)
    }

    /// Look up the record for `path`.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<ProcessedRecord> {
        self.records.lock().get(&Self::normalize(path)).cloned()
    }

    /// Remove the entry for `path`, forcing reprocessing on the next
    /// scan. Returns whether an entry existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn remove(&self, path: &Path) -> Result<bool> {
        let mut records = self.records.lock();
        let removed = records.remove(&Self::normalize(path)).is_some();
        if removed {
            self.save_locked(&records)?;
        }
        Ok(removed)
    }

    /// Remove every failure entry so those files are picked up again.
    /// Returns how many entries were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be written.
    pub fn reset_failures(&self) -> Result<usize> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, record| record.outcome != ProcessedOutcome::Failure);
        let removed = before - records.len();
        if removed > 0 {
            self.save_locked(&records)?;
        }
        Ok(removed)
    }

    /// Snapshot of all entries, sorted by path.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, ProcessedRecord)> {
        let records = self.records.lock();
        let mut entries: Vec<_> = records
            .iter()
            .map(|(path, record)| (path.clone(), record.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Number of ledger entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the ledger is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Normalize a path to its ledger key.
    ///
    /// Canonicalizes when the file still exists; falls back to the
    /// lexical path so entries for moved files remain addressable.
    #[must_use]
    pub fn normalize(path: &Path) -> String {
        path.canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .display()
            .to_string()
    }

    fn save_locked(&self, records: &HashMap<String, ProcessedRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Save {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let json = serde_json::to_string_pretty(records).map_err(|e| StorageError::Save {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        std::fs::write(&self.path, json).map_err(|e| StorageError::Save {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

impl std::fmt::Debug for ProcessedRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessedRecordStore")
            .field("path", &self.path)
            .field("entries", &self.len())
            .finish()
    }
}

/// File modification time as Unix seconds, when the file can be stat'd.
#[must_use]
pub fn mtime_of(path: &Path) -> Option<i64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    i64::try_from(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ProcessedOutcome;
    use filetime_shim::set_file_mtime_secs;
    use std::fs;
    use tempfile::TempDir;

    /// Minimal mtime setter for tests; avoids an extra dev-dependency.
    mod filetime_shim {
        use std::fs;
        use std::path::Path;
        use std::time::{Duration, SystemTime, UNIX_EPOCH};

        pub fn set_file_mtime_secs(path: &Path, secs: u64) {
            let times = fs::FileTimes::new()
                .set_modified(SystemTime::from(UNIX_EPOCH + Duration::from_secs(secs)));
            let file = fs::File::options().write(true).open(path).unwrap();
            file.set_times(times).unwrap();
        }
    }

    fn ledger_in(tmp: &TempDir) -> ProcessedRecordStore {
        ProcessedRecordStore::open(tmp.path().join("ledger.json")).unwrap()
    }

    #[test]
    fn test_open_creates_empty_ledger() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_and_reload() {
        let tmp = TempDir::new().unwrap();
        let ledger_path = tmp.path().join("ledger.json");
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        {
            let store = ProcessedRecordStore::open(&ledger_path).unwrap();
            let record = ProcessedRecord::new(
                mtime_of(&file).unwrap(),
                5,
                ProcessedOutcome::Success,
            )
            .with_destination_id("page-1");
            store.insert(&file, record).unwrap();
        }

        // Reopen from disk.
        let store = ProcessedRecordStore::open(&ledger_path).unwrap();
        assert_eq!(store.len(), 1);
        let record = store.get(&file).unwrap();
        assert_eq!(record.destination_id.as_deref(), Some("page-1"));
    }

    #[test]
    fn test_is_processed_with_unchanged_mtime() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        let mtime = mtime_of(&file).unwrap();
        store
            .insert(&file, ProcessedRecord::new(mtime, 5, ProcessedOutcome::Success))
            .unwrap();

        assert!(store.is_processed(&file));
    }

    #[test]
    fn test_mtime_drift_means_new_content() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        let mtime = mtime_of(&file).unwrap();
        store
            .insert(&file, ProcessedRecord::new(mtime, 5, ProcessedOutcome::Success))
            .unwrap();

        // Push the file's mtime 10 seconds forward: new content.
        set_file_mtime_secs(&file, u64::try_from(mtime).unwrap() + 10);
        assert!(!store.is_processed(&file));
    }

    #[test]
    fn test_one_second_drift_is_tolerated() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        let mtime = mtime_of(&file).unwrap();
        store
            .insert(&file, ProcessedRecord::new(mtime - 1, 5, ProcessedOutcome::Success))
            .unwrap();

        assert!(store.is_processed(&file));
    }

    #[test]
    fn test_unknown_path_is_unprocessed() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        assert!(!store.is_processed(Path::new("/nowhere/paper.pdf")));
    }

    #[test]
    fn test_missing_file_is_unprocessed_even_with_entry() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        let ghost = tmp.path().join("ghost.pdf");

        store
            .insert(&ghost, ProcessedRecord::new(100, 5, ProcessedOutcome::Success))
            .unwrap();
        assert!(!store.is_processed(&ghost));
    }

    #[test]
    fn test_corrupt_document_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let ledger_path = tmp.path().join("ledger.json");
        fs::write(&ledger_path, "{ not json").unwrap();

        let store = ProcessedRecordStore::open(&ledger_path).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_one_entry_per_path() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        store
            .insert(&file, ProcessedRecord::new(1, 1, ProcessedOutcome::Failure))
            .unwrap();
        store
            .insert(&file, ProcessedRecord::new(2, 2, ProcessedOutcome::Success))
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&file).unwrap().outcome, ProcessedOutcome::Success);
    }

    #[test]
    fn test_remove_forces_reprocessing() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        let mtime = mtime_of(&file).unwrap();
        store
            .insert(&file, ProcessedRecord::new(mtime, 5, ProcessedOutcome::Success))
            .unwrap();
        assert!(store.is_processed(&file));

        assert!(store.remove(&file).unwrap());
        assert!(!store.is_processed(&file));
        assert!(!store.remove(&file).unwrap());
    }

    #[test]
    fn test_reset_failures_keeps_other_outcomes() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);

        store
            .insert(
                Path::new("/a.pdf"),
                ProcessedRecord::new(1, 1, ProcessedOutcome::Failure),
            )
            .unwrap();
        store
            .insert(
                Path::new("/b.pdf"),
                ProcessedRecord::new(1, 1, ProcessedOutcome::Success),
            )
            .unwrap();
        store
            .insert(
                Path::new("/c.pdf"),
                ProcessedRecord::new(1, 1, ProcessedOutcome::Duplicate),
            )
            .unwrap();

        assert_eq!(store.reset_failures().unwrap(), 1);
        assert_eq!(store.len(), 2);
        assert!(store.get(Path::new("/a.pdf")).is_none());
    }

    #[test]
    fn test_entries_sorted_by_path() {
        let tmp = TempDir::new().unwrap();
        let store = ledger_in(&tmp);

        store
            .insert(
                Path::new("/z.pdf"),
                ProcessedRecord::new(1, 1, ProcessedOutcome::Success),
            )
            .unwrap();
        store
            .insert(
                Path::new("/a.pdf"),
                ProcessedRecord::new(1, 1, ProcessedOutcome::Success),
            )
            .unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].0.ends_with("a.pdf"));
        assert!(entries[1].0.ends_with("z.pdf"));
    }

    #[test]
    fn test_document_is_human_readable() {
        let tmp = TempDir::new().unwrap();
        let ledger_path = tmp.path().join("ledger.json");
        let store = ProcessedRecordStore::open(&ledger_path).unwrap();
        let file = tmp.path().join("paper.pdf");
        fs::write(&file, b"%PDF-").unwrap();

        store
            .insert(&file, ProcessedRecord::new(1, 1, ProcessedOutcome::Success))
            .unwrap();

        let raw = fs::read_to_string(&ledger_path).unwrap();
        assert!(raw.contains("paper.pdf"));
        assert!(raw.contains("\"outcome\": \"success\""));
    }
}
