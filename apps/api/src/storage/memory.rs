//! In-process stores. Used by the test suite and handy for running the API
//! without PostgreSQL or S3.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::models::analysis::AnalysisRecord;
use crate::storage::{BlobStore, StoreError, TrackingStore, Transition, TransitionOutcome};

#[derive(Default)]
pub struct MemoryTrackingStore {
    records: RwLock<HashMap<String, AnalysisRecord>>,
    unavailable: AtomicBool,
    /// Number of upcoming transitions that fail as if the write was lost.
    failing_transitions: AtomicUsize,
}

impl MemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation fail, simulating a lost connection.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn fail_next_transitions(&self, count: usize) {
        self.failing_transitions.store(count, Ordering::SeqCst);
    }

    /// Inserts or replaces a record without any checks.
    pub async fn insert_raw(&self, record: AnalysisRecord) {
        self.records
            .write()
            .await
            .insert(record.analysis_id.clone(), record);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Tracking("tracking store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TrackingStore for MemoryTrackingStore {
    async fn create(&self, record: &AnalysisRecord) -> Result<(), StoreError> {
        self.check_available()?;
        let mut records = self.records.write().await;
        if records.contains_key(&record.analysis_id) {
            return Err(StoreError::AlreadyExists(record.analysis_id.clone()));
        }
        records.insert(record.analysis_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, analysis_id: &str) -> Result<Option<AnalysisRecord>, StoreError> {
        self.check_available()?;
        Ok(self.records.read().await.get(analysis_id).cloned())
    }

    async fn transition(
        &self,
        analysis_id: &str,
        transition: Transition,
    ) -> Result<TransitionOutcome, StoreError> {
        self.check_available()?;
        let remaining_failures = self
            .failing_transitions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if remaining_failures.is_ok() {
            return Err(StoreError::Tracking("conditional update failed".to_string()));
        }

        let mut records = self.records.write().await;
        let Some(record) = records.get_mut(analysis_id) else {
            return Ok(TransitionOutcome::Missing);
        };
        if !transition.permits(&record.status) {
            return Ok(TransitionOutcome::Rejected {
                current: record.status.clone(),
            });
        }
        transition.apply_to(record);
        Ok(TransitionOutcome::Applied)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
    unavailable: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn object_count(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn remove(&self, key: &str) {
        self.blobs.write().await.remove(key);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Blob("blob store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_text(&self, key: &str, body: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.blobs
            .write()
            .await
            .insert(key.to_string(), Bytes::copy_from_slice(body.as_bytes()));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StoreError> {
        self.check_available()?;
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(key.to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }
}
