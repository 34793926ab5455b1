//! # refsmith
//!
//! Extract structured citation metadata from free-text bibliographic
//! references with an LLM, optionally enrich records against PubMed, and
//! export the results as JSON, RIS, or CSV.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (ReferenceRecord, BatchOutcome)
//! - [`llm`]: Chat-completion client, extraction prompt, and reply parsing
//! - [`enrich`]: Bibliographic index enrichment (PubMed E-utilities)
//! - [`pipeline`]: Retry, validation, and concurrent batch orchestration
//! - [`output`]: JSON/RIS/CSV serializers
//! - [`server`]: HTTP boundary (process, download, health)
//! - [`config`]: Configuration management
//! - [`utils`]: HTTP client, rate limiting, correlation ids

pub mod config;
pub mod enrich;
pub mod llm;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod utils;

// Re-export commonly used types
pub use models::{BatchOutcome, ExtractionStatus, ReferenceRecord};
pub use pipeline::Pipeline;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
