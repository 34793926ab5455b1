//! Reference processing pipeline.
//!
//! Drives one reference through prompt construction, the LLM call, JSON
//! extraction, validation, and optional index enrichment, with bounded
//! retry around the whole attempt. Batches fan out over a task pool and
//! results are reassembled in input order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::enrich::Enricher;
use crate::llm::{extract_json, extraction_prompt, LlmClient};
use crate::models::{BatchOutcome, ReferenceRecord};
use crate::utils::{request_id, ApiRateLimiter};

/// Split pasted input into individual references, one per non-empty line
pub fn split_references(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Bounded retry settings for a single reference
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per reference, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay: Duration::from_secs(1),
        }
    }
}

/// Orchestrates extraction and enrichment for references.
///
/// Cloning is cheap; all shared state sits behind `Arc`.
#[derive(Debug, Clone)]
pub struct Pipeline {
    llm: Arc<dyn LlmClient>,
    enricher: Option<Arc<dyn Enricher>>,
    limiter: Arc<ApiRateLimiter>,
    retry: RetryPolicy,
    max_concurrent: usize,
}

impl Pipeline {
    pub fn new(llm: Arc<dyn LlmClient>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            enricher: None,
            limiter: Arc::new(ApiRateLimiter::new(config.requests_per_second)),
            retry: RetryPolicy {
                max_attempts: config.max_attempts.max(1),
                retry_delay: Duration::from_secs(config.retry_delay_secs),
            },
            max_concurrent: config.max_concurrent.max(1),
        }
    }

    /// Attach an enrichment source consulted after successful extraction
    pub fn with_enricher(mut self, enricher: Arc<dyn Enricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Process one reference with bounded retry.
    ///
    /// An attempt succeeds only when the LLM call returns, the reply
    /// contains a JSON object, the object deserializes, and the record
    /// reports `found` with title or authors populated. Anything else
    /// counts as a failed attempt. After the last attempt the reference
    /// is returned as not found with the attempts exhausted error.
    pub async fn process_reference(
        &self,
        reference: &str,
        api_key: &str,
        request_id: &str,
    ) -> ReferenceRecord {
        let reference = reference.trim();
        if reference.is_empty() {
            return ReferenceRecord::not_found(reference, "Empty reference");
        }

        let prompt = extraction_prompt(reference);

        for attempt in 1..=self.retry.max_attempts {
            if attempt > 1 {
                debug!(
                    "[{}] retrying reference (attempt {}/{})",
                    request_id, attempt, self.retry.max_attempts
                );
                tokio::time::sleep(self.retry.retry_delay).await;
            }

            self.limiter.acquire().await;

            let raw = match self.llm.complete(&prompt, api_key, request_id).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("[{}] LLM call failed: {}", request_id, e);
                    continue;
                }
            };

            let value = match extract_json(&raw) {
                Some(value) if value.is_object() => value,
                Some(_) => {
                    warn!("[{}] reply contained JSON but not an object", request_id);
                    continue;
                }
                None => {
                    warn!("[{}] no JSON found in reply", request_id);
                    continue;
                }
            };

            let mut record = match ReferenceRecord::from_extraction(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!("[{}] extracted JSON did not deserialize: {}", request_id, e);
                    continue;
                }
            };

            record.original_reference = reference.to_string();
            record.derive_url();

            if !record.is_found() || !record.has_extracted_content() {
                debug!("[{}] extraction reported nothing usable", request_id);
                continue;
            }

            return self.enrich(record, request_id).await;
        }

        ReferenceRecord::not_found(reference, "All attempts failed")
    }

    /// Consult the enrichment source, keeping the extracted record on a
    /// miss or a lookup failure
    async fn enrich(&self, record: ReferenceRecord, request_id: &str) -> ReferenceRecord {
        let Some(enricher) = &self.enricher else {
            return record;
        };

        match enricher.enrich(&record, request_id).await {
            Ok(Some(merged)) => {
                debug!("[{}] record enriched from index", request_id);
                merged
            }
            Ok(None) => record,
            Err(e) => {
                warn!("[{}] enrichment failed, keeping extraction: {}", request_id, e);
                record
            }
        }
    }

    /// Process a batch concurrently, preserving input order.
    ///
    /// References run on a task pool capped at `max_concurrent`. A task
    /// that fails to complete yields a not-found slot for its reference
    /// rather than discarding the rest of the batch.
    pub async fn process_batch(&self, references: &[String], api_key: &str) -> BatchOutcome {
        let request_id = request_id("REQ");
        let started = Instant::now();
        info!(
            "[{}] processing batch of {} references",
            request_id,
            references.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut handles = Vec::with_capacity(references.len());

        for reference in references {
            let pipeline = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let reference = reference.clone();
            let api_key = api_key.to_string();
            let request_id = request_id.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                pipeline
                    .process_reference(&reference, &api_key, &request_id)
                    .await
            }));
        }

        let mut records = Vec::with_capacity(handles.len());
        for (handle, reference) in handles.into_iter().zip(references) {
            match handle.await {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("[{}] reference task did not complete: {}", request_id, e);
                    records.push(ReferenceRecord::not_found(
                        reference.trim(),
                        "Internal processing error",
                    ));
                }
            }
        }

        let outcome = BatchOutcome::new(records, started.elapsed());
        info!(
            "[{}] batch finished: {} found, {} not found in {}",
            request_id,
            outcome.found(),
            outcome.not_found(),
            outcome.elapsed_display()
        );
        outcome
    }
}
