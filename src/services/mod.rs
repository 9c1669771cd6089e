//! Capability interfaces consumed by the pipeline core.
//!
//! The OCR/text-extraction backend, LLM metadata and summary generation,
//! the bibliographic registry, citation lookup, the destination record
//! store, and chat notifications are all external collaborators. The core
//! only ever sees these traits; concrete implementations are constructed
//! once at process start and injected into the orchestrator.

mod types;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::model::{PaperIdentity, RegistryRecord};
use crate::Result;

pub use types::{NewRecord, PipelineEvent, StoredRecord};

/// Text extraction backend (OCR or native text layer).
///
/// The quick attempt is expected to return fast and may come up short on
/// scanned documents; the thorough attempt may take minutes and is called
/// only when the quick one fails or under-delivers.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Fast extraction attempt.
    async fn extract_quick(&self, path: &Path) -> Result<String>;

    /// Slow, thorough extraction attempt.
    async fn extract_thorough(&self, path: &Path) -> Result<String>;
}

/// Metadata extraction backend producing a provisional identity from raw
/// document text.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Extract a provisional [`PaperIdentity`] from document text.
    async fn extract_identity(&self, text: &str, file_name: &str) -> Result<PaperIdentity>;
}

/// Summary generation backend.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    /// Produce a prose summary of the document.
    async fn summarize(&self, text: &str, identity: &PaperIdentity) -> Result<String>;
}

/// External bibliographic registry.
///
/// Errors use [`ResolveError`] so the searcher can distinguish transient
/// failures (retried with backoff) from rate limiting and hard failures.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Run a query string; returns candidate identifiers, best first.
    async fn search(&self, query: &str) -> std::result::Result<Vec<String>, ResolveError>;

    /// Fetch the full record for one identifier.
    async fn fetch(
        &self,
        id: &str,
    ) -> std::result::Result<Option<RegistryRecord>, ResolveError>;
}

/// Citation-count lookup, keyed by DOI with a title fallback.
#[async_trait]
pub trait CitationLookup: Send + Sync {
    /// Return the citation count, or `None` when the work is unknown.
    async fn citation_count(
        &self,
        doi: Option<&str>,
        title: Option<&str>,
    ) -> Result<Option<u64>>;
}

/// Destination record store where finalized records are persisted.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Look up a record by its identifier (DOI).
    async fn find_by_identifier(&self, doi: &str) -> Result<Option<StoredRecord>>;

    /// Query records whose titles are candidates for the given title.
    async fn find_by_title(&self, title: &str) -> Result<Vec<StoredRecord>>;

    /// Persist a finalized record; returns the destination id.
    async fn create(&self, record: &NewRecord) -> Result<String>;
}

/// Best-effort notification sink; failures never abort the pipeline.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one pipeline event.
    async fn notify(&self, event: &PipelineEvent) -> Result<()>;
}

/// Bundle of capability implementations injected into the orchestrator.
#[derive(Clone)]
pub struct Services {
    /// Text extraction backend.
    pub text: Arc<dyn TextExtractor>,
    /// Metadata extraction backend.
    pub metadata: Arc<dyn MetadataExtractor>,
    /// Summary generation backend.
    pub summary: Arc<dyn SummaryGenerator>,
    /// Bibliographic registry client.
    pub registry: Arc<dyn RegistryClient>,
    /// Citation-count lookup.
    pub citations: Arc<dyn CitationLookup>,
    /// Destination record store.
    pub destination: Arc<dyn DestinationStore>,
    /// Notification sink.
    pub notifications: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
