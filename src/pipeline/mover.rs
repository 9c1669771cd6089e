//! Moves processed files into the success/failed areas.

use std::path::{Path, PathBuf};

use chrono::Utc;

/// Moves files out of the watch directory after processing.
///
/// Files are never deleted: successes land in the success area with a
/// short identifier suffix, failures land in the failed area with their
/// original name preserved for inspection. Both areas are organized in
/// year-month subfolders; name collisions get a numeric suffix.
#[derive(Debug, Clone)]
pub struct FileMover {
    success_dir: PathBuf,
    failed_dir: PathBuf,
}

/// How much of the destination id is appended to a success filename.
const ID_SUFFIX_LEN: usize = 8;

impl FileMover {
    /// Create a mover targeting the given areas.
    #[must_use]
    pub fn new(success_dir: PathBuf, failed_dir: PathBuf) -> Self {
        Self {
            success_dir,
            failed_dir,
        }
    }

    /// Move a successfully processed file, appending the identifier.
    ///
    /// Returns the new location; a failed move is logged and yields
    /// `None` (the ledger entry then records the original location).
    pub fn move_success(&self, path: &Path, destination_id: &str) -> Option<PathBuf> {
        let suffix: String = destination_id.chars().take(ID_SUFFIX_LEN).collect();
        self.move_into(&self.success_dir, path, Some(&suffix))
    }

    /// Move a failed file, preserving its original name.
    pub fn move_failed(&self, path: &Path) -> Option<PathBuf> {
        self.move_into(&self.failed_dir, path, None)
    }

    fn move_into(&self, area: &Path, path: &Path, suffix: Option<&str>) -> Option<PathBuf> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "File to move no longer exists");
            return None;
        }

        let month_dir = area.join(Utc::now().format("%Y-%m").to_string());
        if let Err(e) = std::fs::create_dir_all(&month_dir) {
            tracing::error!(dir = %month_dir.display(), error = %e, "Cannot create move target");
            return None;
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_default();

        let base_name = match suffix {
            Some(suffix) if !suffix.is_empty() => format!("{stem}_{suffix}"),
            _ => stem.to_string(),
        };

        let mut dest = month_dir.join(format!("{base_name}{ext}"));
        let mut counter = 1;
        while dest.exists() {
            dest = month_dir.join(format!("{base_name}_{counter}{ext}"));
            counter += 1;
        }

        match std::fs::rename(path, &dest) {
            Ok(()) => {
                tracing::info!(
                    from = %path.display(),
                    to = %dest.display(),
                    "Moved processed file"
                );
                Some(dest)
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "Failed to move processed file"
                );
                None
            }
        }
    }
}
