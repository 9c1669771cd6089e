//! Candidate-file filtering for the watched directory.

use std::path::Path;

use crate::config::WatchConfig;

/// Why a path was rejected, or that it was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// Path passes every gate.
    Accept,
    /// Not a regular file (directory, gone, special).
    NotAFile,
    /// Extension not on the allow-list.
    WrongExtension,
    /// Dotfile or editor/copy temp file.
    HiddenOrTemp,
    /// Zero-byte file.
    Empty,
    /// Above the configured size ceiling.
    TooLarge,
}

/// File filter applying the ingestion gates: extension allow-list,
/// hidden/temp rejection, zero-byte rejection, size ceiling.
#[derive(Debug, Clone)]
pub struct FileFilter {
    extensions: Vec<String>,
    max_size_bytes: u64,
}

impl FileFilter {
    /// Build a filter from the watcher configuration.
    #[must_use]
    pub fn new(config: &WatchConfig) -> Self {
        Self {
            extensions: config
                .extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            max_size_bytes: config.max_file_size_mb * 1024 * 1024,
        }
    }

    /// Evaluate every gate for `path`.
    #[must_use]
    pub fn check(&self, path: &Path) -> FilterVerdict {
        if !self.has_allowed_extension(path) {
            return FilterVerdict::WrongExtension;
        }

        if Self::is_hidden_or_temp(path) {
            return FilterVerdict::HiddenOrTemp;
        }

        if !path.is_file() {
            return FilterVerdict::NotAFile;
        }

        match path.metadata().map(|m| m.len()) {
            Ok(0) => FilterVerdict::Empty,
            Ok(size) if size > self.max_size_bytes => FilterVerdict::TooLarge,
            Ok(_) => FilterVerdict::Accept,
            Err(_) => FilterVerdict::NotAFile,
        }
    }

    /// Whether `path` passes every gate.
    #[must_use]
    pub fn should_ingest(&self, path: &Path) -> bool {
        self.check(path) == FilterVerdict::Accept
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_lowercase());
        self.extensions.iter().any(|allowed| allowed == &dotted)
    }

    fn is_hidden_or_temp(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with('.') || name.starts_with('~'))
    }
}
