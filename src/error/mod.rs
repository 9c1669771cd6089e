//! Error types and Result aliases for paperflow.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.
//!
//! Two outcomes are deliberately NOT errors: a rejected match candidate
//! (a normal negative validation result, modeled as `Option`) and a
//! registry search that exhausts every strategy (`Ok(None)`).

use thiserror::Error;

/// Result type alias using paperflow's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for paperflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Processed-record ledger error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Identity resolution error.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Pipeline execution error.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Processed-record ledger errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The ledger document could not be read or parsed.
    #[error("failed to load ledger '{path}': {reason}")]
    Load { path: String, reason: String },

    /// The ledger document could not be written.
    #[error("failed to save ledger '{path}': {reason}")]
    Save { path: String, reason: String },
}

/// Identity resolution errors.
///
/// `Transient` is retried with backoff; `RateLimited` waits and retries
/// once. Both are absorbed inside a single strategy pass and converted to
/// "try the next strategy" rather than propagated to the orchestrator.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Recoverable network failure from the registry backend.
    #[error("transient registry error: {0}")]
    Transient(String),

    /// The registry backend signalled rate limiting.
    #[error("registry rate limited: {0}")]
    RateLimited(String),

    /// Non-transient backend failure (bad response, protocol error).
    #[error("registry backend error: {0}")]
    Backend(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Startup reconciliation scan failed.
    #[error("scan error: {0}")]
    Scan(String),
}

/// Per-file pipeline errors.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The input file cannot produce a usable record (e.g. extracted text
    /// below the minimum length). Aborts this file only.
    #[error("unrecoverable input: {0}")]
    UnrecoverableInput(String),

    /// Text extraction backend failure after both attempts.
    #[error("extraction failed for '{file}': {reason}")]
    Extraction { file: String, reason: String },

    /// The destination store refused the finalized record.
    #[error("destination write failed: {0}")]
    Destination(String),

    /// The ingestion queue is closed; the pool is shutting down.
    #[error("ingestion queue closed")]
    QueueClosed,
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl ResolveError {
    /// Whether a bounded retry is worthwhile for this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::RateLimited(_))
    }
}
