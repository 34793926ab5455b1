//! Bibliographic enrichment backends.
//!
//! Enrichment cross-checks an extracted record against an authoritative
//! literature index and merges the authoritative fields over the extracted
//! ones. It is strictly best-effort: the pipeline keeps the original record
//! whenever lookup fails or nothing matches.

mod pubmed;

pub use pubmed::PubMedEnricher;

use async_trait::async_trait;

use crate::models::ReferenceRecord;

/// Interface to a bibliographic enrichment backend
#[async_trait]
pub trait Enricher: Send + Sync + std::fmt::Debug {
    /// Look up a candidate for `record` and merge it over the extracted
    /// fields.
    ///
    /// Returns `Ok(Some(merged))` on a successful merge, `Ok(None)` when no
    /// acceptable candidate was found, and `Err` when the lookup itself
    /// failed. Callers treat `Ok(None)` and `Err` the same way: keep the
    /// original record.
    async fn enrich(
        &self,
        record: &ReferenceRecord,
        request_id: &str,
    ) -> Result<Option<ReferenceRecord>, EnrichError>;
}

/// Errors that can occur during an enrichment lookup
#[derive(Debug, thiserror::Error)]
pub enum EnrichError {
    /// Network, connect, or timeout error
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the index
    #[error("API error: {0}")]
    Api(String),

    /// Search or fetch payload could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for EnrichError {
    fn from(err: reqwest::Error) -> Self {
        EnrichError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for EnrichError {
    fn from(err: serde_json::Error) -> Self {
        EnrichError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for EnrichError {
    fn from(err: quick_xml::DeError) -> Self {
        EnrichError::Parse(format!("XML: {}", err))
    }
}
