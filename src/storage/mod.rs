//! Durable processed-record state.
//!
//! The only state this crate persists itself: a single JSON document
//! mapping normalized paths to their last processing outcome. The
//! destination record store is an external capability, not ours.

mod models;
mod records;

pub use models::{ProcessedOutcome, ProcessedRecord};
pub use records::{mtime_of, ProcessedRecordStore};
