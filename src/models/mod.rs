//! Core data models for reference extraction and batch processing.

mod batch;
mod record;

pub use batch::BatchOutcome;
pub use record::{ExtractionStatus, ReferenceRecord};
