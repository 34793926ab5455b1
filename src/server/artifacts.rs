//! In-memory store for generated download payloads.
//!
//! Each processed batch is serialized once into all three formats and
//! parked here under a short id. The download endpoint serves straight
//! from this store, so nothing round-trips through the client and no
//! files touch disk. Entries expire after a fixed TTL and are purged
//! opportunistically on insert.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::output::OutputFormat;

struct StoredArtifacts {
    json: String,
    ris: String,
    csv: String,
    created_at: Instant,
}

impl StoredArtifacts {
    fn payload(&self, format: OutputFormat) -> &str {
        match format {
            OutputFormat::Json => &self.json,
            OutputFormat::Ris => &self.ris,
            OutputFormat::Csv => &self.csv,
        }
    }
}

/// Keyed store of serialized batches awaiting download
pub struct ArtifactStore {
    entries: RwLock<HashMap<String, StoredArtifacts>>,
    ttl: Duration,
}

impl ArtifactStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Store one batch's serialized payloads, returning the download id
    pub async fn insert(&self, json: String, ris: String, csv: String) -> String {
        let id = format!(
            "{:x}",
            md5::compute(format!("{}{}", json, Utc::now().timestamp_millis()))
        );

        let mut entries = self.entries.write().await;
        entries.retain(|_, stored| stored.created_at.elapsed() < self.ttl);
        entries.insert(
            id.clone(),
            StoredArtifacts {
                json,
                ris,
                csv,
                created_at: Instant::now(),
            },
        );

        id
    }

    /// Fetch one format of a stored batch; `None` when unknown or expired
    pub async fn get(&self, id: &str, format: OutputFormat) -> Option<String> {
        let entries = self.entries.read().await;
        let stored = entries.get(id)?;
        if stored.created_at.elapsed() >= self.ttl {
            return None;
        }
        Some(stored.payload(format).to_string())
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_then_get_all_formats() {
        let store = ArtifactStore::new(Duration::from_secs(600));
        let id = store
            .insert("[]".to_string(), "TY  - JOUR".to_string(), "status\n".to_string())
            .await;

        assert_eq!(store.get(&id, OutputFormat::Json).await.as_deref(), Some("[]"));
        assert_eq!(
            store.get(&id, OutputFormat::Ris).await.as_deref(),
            Some("TY  - JOUR")
        );
        assert_eq!(
            store.get(&id, OutputFormat::Csv).await.as_deref(),
            Some("status\n")
        );
    }

    #[tokio::test]
    async fn test_unknown_id_misses() {
        let store = ArtifactStore::new(Duration::from_secs(600));
        assert!(store.get("deadbeef", OutputFormat::Json).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_misses() {
        let store = ArtifactStore::new(Duration::from_secs(0));
        let id = store
            .insert("[]".to_string(), String::new(), String::new())
            .await;

        assert!(store.get(&id, OutputFormat::Json).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_purged_on_insert() {
        let store = ArtifactStore::new(Duration::from_secs(0));
        store
            .insert("first".to_string(), String::new(), String::new())
            .await;
        store
            .insert("second".to_string(), String::new(), String::new())
            .await;

        // The first entry was already expired when the second arrived
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_batches_get_distinct_ids() {
        let store = ArtifactStore::new(Duration::from_secs(600));
        let a = store
            .insert("[1]".to_string(), String::new(), String::new())
            .await;
        let b = store
            .insert("[2]".to_string(), String::new(), String::new())
            .await;

        assert_ne!(a, b);
    }
}
