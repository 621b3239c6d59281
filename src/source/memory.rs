use bytes::Bytes;
use multivision_common::SegmentIndex;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{FetchError, SegmentSource};

/// Blobs held in memory, with optional artificial latency.
#[derive(Default)]
pub struct MemorySegmentSource {
    blobs: Mutex<HashMap<SegmentIndex, Bytes>>,
    latency: Duration,
    requests: AtomicUsize,
}

impl MemorySegmentSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn insert(&self, index: SegmentIndex, blob: Bytes) {
        self.blobs.lock().insert(index, blob);
    }

    /// Number of fetches served (including misses).
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }
}

impl FromIterator<(SegmentIndex, Bytes)> for MemorySegmentSource {
    fn from_iter<I: IntoIterator<Item = (SegmentIndex, Bytes)>>(iter: I) -> Self {
        Self {
            blobs: Mutex::new(iter.into_iter().collect()),
            ..Self::default()
        }
    }
}

#[async_trait::async_trait]
impl SegmentSource for MemorySegmentSource {
    async fn fetch(&self, index: SegmentIndex) -> Result<Bytes, FetchError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.blobs
            .lock()
            .get(&index)
            .cloned()
            .ok_or(FetchError::NotFound(index))
    }

    fn describe(&self) -> String {
        format!("memory ({} blobs)", self.len())
    }
}
