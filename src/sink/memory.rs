//! In-memory retention of the most recent recording.
//!
//! `LatestRecordingStore` always holds the newest artifact for the
//! `GET /api/v1/recordings/latest` endpoint, independent of which sink kind
//! is configured. `MemorySink` is a `RecordingSink` backed by the same
//! store, used when no durable storage is wanted (and in tests).

use crate::error::RelayError;
use crate::sink::{RecordingSink, SinkHandle};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};

/// One retained recording.
#[derive(Debug, Clone)]
pub struct StoredRecording {
    pub container: Vec<u8>,
    pub recorded_at: DateTime<Utc>,
}

/// Shared slot holding the most recent finalized recording.
#[derive(Debug, Clone, Default)]
pub struct LatestRecordingStore {
    slot: Arc<RwLock<Option<StoredRecording>>>,
}

impl LatestRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the retained recording with a newer one.
    pub fn put(&self, container: Vec<u8>, recorded_at: DateTime<Utc>) {
        *self.slot.write().unwrap() = Some(StoredRecording {
            container,
            recorded_at,
        });
    }

    /// Copy of the retained recording, if any.
    pub fn latest(&self) -> Option<StoredRecording> {
        self.slot.read().unwrap().clone()
    }
}

/// Sink that only keeps the artifact in memory.
pub struct MemorySink {
    store: LatestRecordingStore,
}

impl MemorySink {
    pub fn new(store: LatestRecordingStore) -> Self {
        Self { store }
    }
}

impl RecordingSink for MemorySink {
    fn deliver(
        &self,
        container: &[u8],
        recorded_at: DateTime<Utc>,
    ) -> Result<SinkHandle, RelayError> {
        self.store.put(container.to_vec(), recorded_at);
        Ok(SinkHandle(format!(
            "memory:{}",
            recorded_at.format("%Y%m%dT%H%M%S%3f")
        )))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_keeps_only_newest() {
        let store = LatestRecordingStore::new();
        assert!(store.latest().is_none());

        store.put(vec![1], Utc::now());
        store.put(vec![2, 3], Utc::now());
        assert_eq!(store.latest().unwrap().container, vec![2, 3]);
    }

    #[test]
    fn test_memory_sink_delivers_into_store() {
        let store = LatestRecordingStore::new();
        let sink = MemorySink::new(store.clone());

        let handle = sink.deliver(&[9, 9, 9], Utc::now()).unwrap();
        assert!(handle.0.starts_with("memory:"));
        assert_eq!(store.latest().unwrap().container, vec![9, 9, 9]);
    }
}
