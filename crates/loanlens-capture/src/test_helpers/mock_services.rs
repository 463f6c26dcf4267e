//! Mock storage, sink and composer

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use loanlens_core::models::{
    CaptureRequest, CapturedPhoto, EvidenceSubmission, GeoFix, SubmissionReceipt,
};
use loanlens_storage::{BlobHandle, Storage, StorageBackend, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::mock_devices::InMemoryMediaStore;
use crate::compose::Composer;
use crate::devices::MediaStore;
use crate::sink::{SinkError, SubmissionSink};

/// Mock storage implementation that stores blobs in memory
#[derive(Default)]
pub struct MockStorage {
    files: Mutex<HashMap<String, (Vec<u8>, String)>>,
    upload_failure: Mutex<Option<String>>,
    url_failure: Mutex<Option<String>>,
    uploads: AtomicUsize,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every upload fail with `message` until cleared with `None`
    pub fn fail_uploads(&self, message: Option<&str>) {
        *self.upload_failure.lock().unwrap() = message.map(str::to_string);
    }

    /// Make URL resolution fail with `message` until cleared with `None`
    pub fn fail_urls(&self, message: Option<&str>) {
        *self.url_failure.lock().unwrap() = message.map(str::to_string);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.files.lock().unwrap().get(key).map(|(_, ct)| ct.clone())
    }

    pub fn upload_attempts(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<BlobHandle> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.upload_failure.lock().unwrap().clone() {
            return Err(StorageError::UploadFailed(message));
        }
        let handle = BlobHandle {
            key: storage_key.to_string(),
            content_type: content_type.to_string(),
            size_bytes: data.len() as u64,
        };
        self.files
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), (data, content_type.to_string()));
        Ok(handle)
    }

    async fn public_url(&self, handle: &BlobHandle) -> StorageResult<String> {
        if let Some(message) = self.url_failure.lock().unwrap().clone() {
            return Err(StorageError::BackendError(message));
        }
        if !self.files.lock().unwrap().contains_key(&handle.key) {
            return Err(StorageError::NotFound(handle.key.clone()));
        }
        Ok(format!("https://storage.example.com/{}", handle.key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(storage_key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.files.lock().unwrap().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Sink that records accepted submissions
#[derive(Default)]
pub struct MockSink {
    submissions: Mutex<Vec<EvidenceSubmission>>,
    failure: Mutex<Option<String>>,
    delay: Option<Duration>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reject every submission with `message` until cleared with `None`
    pub fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(str::to_string);
    }

    pub fn submissions(&self) -> Vec<EvidenceSubmission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubmissionSink for MockSink {
    async fn submit(&self, submission: &EvidenceSubmission) -> Result<SubmissionReceipt, SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(SinkError::Transport(message));
        }
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(submission.clone());
        Ok(SubmissionReceipt {
            submission_id: format!("submission-{}", submissions.len()),
            media_url: submission.media_url.clone(),
        })
    }
}

/// Composer that copies the raw bytes to a new URI, or fails on demand
pub struct MockComposer {
    store: Arc<InMemoryMediaStore>,
    fail: bool,
    calls: Mutex<Vec<(CapturedPhoto, GeoFix, CaptureRequest)>>,
}

impl MockComposer {
    pub fn new(store: Arc<InMemoryMediaStore>) -> Self {
        Self {
            store,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(store: Arc<InMemoryMediaStore>) -> Self {
        Self {
            fail: true,
            ..Self::new(store)
        }
    }

    pub fn calls(&self) -> Vec<(CapturedPhoto, GeoFix, CaptureRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Composer for MockComposer {
    async fn compose(
        &self,
        photo: &CapturedPhoto,
        fix: &GeoFix,
        request: &CaptureRequest,
    ) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((photo.clone(), *fix, request.clone()));
        if self.fail {
            return Err(anyhow!("font rasterizer crashed"));
        }
        let raw = self.store.read(&photo.raw_uri).await?;
        Ok(self.store.write_temp(raw, "jpg").await?)
    }
}
