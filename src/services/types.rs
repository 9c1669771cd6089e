//! Data types crossing the capability-interface boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::PaperIdentity;

/// A record as seen in the destination store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Destination-assigned id.
    pub id: String,
    /// Record title.
    pub title: String,
    /// Identifier (DOI) if the record carries one.
    pub doi: Option<String>,
    /// Whether the record has been archived/removed.
    ///
    /// Archived records never count as existing for deduplication.
    pub archived: bool,
}

/// A finalized record handed to the destination store for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    /// The resolved, enriched identity.
    pub identity: PaperIdentity,
    /// Generated summary, when summarization succeeded.
    pub summary: Option<String>,
    /// Original file name of the source document.
    pub source_file: String,
}

/// Pipeline event delivered to the notification sink.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A file was resolved, persisted, and moved to the success area.
    Success {
        /// Finalized identity.
        identity: PaperIdentity,
        /// Destination id of the created record.
        destination_id: String,
        /// Wall-clock processing time.
        elapsed: Duration,
    },
    /// A file failed and was moved to the failed area.
    Failure {
        /// Original file name.
        file_name: String,
        /// Error text.
        error: String,
        /// Wall-clock processing time.
        elapsed: Duration,
    },
    /// A file matched an existing destination record.
    Duplicate {
        /// Identity as known at the time of the match.
        identity: PaperIdentity,
        /// Id of the pre-existing destination record.
        existing_id: String,
    },
}

impl PipelineEvent {
    /// Short label used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Failure { .. } => "failure",
            Self::Duplicate { .. } => "duplicate",
        }
    }
}
