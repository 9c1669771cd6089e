//! Directory watching and candidate detection.
//!
//! This module provides:
//! - Recursive directory watching with OS-event coalescing
//! - Extension/size/hidden-file filtering
//! - A write-stability gate with a polled pending set
//! - Per-path debounce of duplicate notifications
//! - A reconciling startup scan against the processed-record ledger

mod debounce;
mod directory;
mod filter;
pub(crate) mod handler;
mod scanner;
mod stability;

pub use debounce::DebounceLedger;
pub use directory::DirectoryWatcher;
pub use filter::{FileFilter, FilterVerdict};
pub use handler::{DetectionCallback, DetectionHandler, WatcherStats, WatcherStatsSnapshot};
pub use scanner::{scan_existing, ScanSummary};
pub use stability::{is_file_ready, CandidateFile, PendingSet};
