//! Data models for the processed-record ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final outcome of one processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedOutcome {
    /// Resolved, persisted, moved to the success area.
    Success,
    /// Failed; moved to the failed area for inspection.
    Failure,
    /// Matched an existing destination record.
    Duplicate,
}

impl std::fmt::Display for ProcessedOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Duplicate => "duplicate",
        };
        f.write_str(name)
    }
}

/// One ledger entry, keyed by normalized absolute path.
///
/// The document is meant to be human-inspectable and safe to hand-edit:
/// deleting an entry forces the file to be reprocessed on the next scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// File modification time (Unix seconds) at processing time.
    pub mtime: i64,

    /// File size in bytes at processing time.
    pub size: u64,

    /// How processing ended.
    pub outcome: ProcessedOutcome,

    /// Destination id when a record was created or matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,

    /// Where the physical file was moved, when the move succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_to: Option<String>,

    /// When the entry was written.
    pub timestamp: DateTime<Utc>,
}

impl ProcessedRecord {
    /// Create a record for a file observed at `mtime`/`size`.
    #[must_use]
    pub fn new(mtime: i64, size: u64, outcome: ProcessedOutcome) -> Self {
        Self {
            mtime,
            size,
            outcome,
            destination_id: None,
            moved_to: None,
            timestamp: Utc::now(),
        }
    }

    /// Attach the destination id.
    #[must_use]
    pub fn with_destination_id(mut self, id: impl Into<String>) -> Self {
        self.destination_id = Some(id.into());
        self
    }

    /// Attach the post-move location.
    #[must_use]
    pub fn with_moved_to(mut self, path: impl Into<String>) -> Self {
        self.moved_to = Some(path.into());
        self
    }
}
