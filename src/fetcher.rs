//! Segment fetcher: fetch cursor, in-flight flag and blob splitting.
//!
//! A fetch is split in three so the network wait can run on a spawned task
//! while cursor and cache updates stay on the scheduler's task:
//!
//! 1. [`SegmentFetcher::begin`] claims the in-flight flag and returns a
//!    [`FetchTicket`] for the current cursor.
//! 2. [`SegmentFetcher::retrieve`] downloads and splits the blob.
//! 3. [`SegmentFetcher::complete`] delivers each entity and advances the
//!    cursor.
//!
//! The in-flight flag belongs to the ticket and is released when the ticket
//! is dropped, so a failed, cancelled or panicking fetch never leaves the
//! fetcher locked.

use bytes::Bytes;
use multivision_common::{CameraIndex, EntityKey, SegmentIndex};
use multivision_media::{BlobLayout, MultiplexedSegment};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::source::{FetchError, SegmentSource};

#[derive(Debug, Default)]
struct FetchState {
    cursor: SegmentIndex,
    /// Bumped on every rewind; results from an older epoch are discarded.
    epoch: u64,
    in_flight: bool,
}

/// Releases the in-flight flag on drop.
#[derive(Debug)]
struct InFlightGuard {
    state: Arc<Mutex<FetchState>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.lock().in_flight = false;
    }
}

/// Permission to fetch one segment.
#[derive(Debug)]
pub struct FetchTicket {
    requested_by: CameraIndex,
    index: SegmentIndex,
    epoch: u64,
    _guard: InFlightGuard,
}

impl FetchTicket {
    pub fn requested_by(&self) -> CameraIndex {
        self.requested_by
    }

    pub fn index(&self) -> SegmentIndex {
        self.index
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// A fetch that was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchedSegment {
    /// Camera that was current when the fetch was requested.
    pub requested_by: CameraIndex,
    /// Index of the segment that was fetched (the cursor before advancing).
    pub segment: SegmentIndex,
}

#[derive(Clone)]
pub struct SegmentFetcher {
    source: Arc<dyn SegmentSource>,
    layout: BlobLayout,
    state: Arc<Mutex<FetchState>>,
}

impl SegmentFetcher {
    pub fn new(source: Arc<dyn SegmentSource>, layout: BlobLayout) -> Self {
        Self {
            source,
            layout,
            state: Arc::new(Mutex::new(FetchState::default())),
        }
    }

    pub fn layout(&self) -> BlobLayout {
        self.layout
    }

    pub fn source(&self) -> &Arc<dyn SegmentSource> {
        &self.source
    }

    /// Next segment index that will be requested.
    pub fn cursor(&self) -> SegmentIndex {
        self.state.lock().cursor
    }

    pub fn epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    pub fn is_fetching(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Move the cursor to `index`, invalidating fetches started before.
    pub fn rewind(&self, index: SegmentIndex) {
        let mut state = self.state.lock();
        state.cursor = index;
        state.epoch += 1;
        tracing::debug!(segment = %index, epoch = state.epoch, "Fetch cursor moved");
    }

    /// Claim the in-flight flag for the segment at the cursor.
    pub fn begin(&self, requested_by: CameraIndex) -> Result<FetchTicket, FetchError> {
        let mut state = self.state.lock();
        if state.in_flight {
            return Err(FetchError::AlreadyFetching);
        }
        state.in_flight = true;

        Ok(FetchTicket {
            requested_by,
            index: state.cursor,
            epoch: state.epoch,
            _guard: InFlightGuard {
                state: Arc::clone(&self.state),
            },
        })
    }

    /// Download and split the blob for `ticket`.
    pub async fn retrieve(&self, ticket: &FetchTicket) -> Result<MultiplexedSegment, FetchError> {
        let blob = self.source.fetch(ticket.index).await?;
        Ok(self.layout.split(blob)?)
    }

    /// Finish a fetch: deliver every entity to `deliver` and advance the cursor.
    ///
    /// Returns `Ok(None)` when the cursor was rewound after the ticket was
    /// issued; nothing is delivered in that case. The ticket is consumed, so
    /// the in-flight flag is released on every path.
    pub fn complete<F>(
        &self,
        ticket: FetchTicket,
        result: Result<MultiplexedSegment, FetchError>,
        mut deliver: F,
    ) -> Result<Option<FetchedSegment>, FetchError>
    where
        F: FnMut(EntityKey, SegmentIndex, Bytes),
    {
        let segment = result?;

        {
            let mut state = self.state.lock();
            if state.epoch != ticket.epoch {
                tracing::debug!(
                    segment = %ticket.index,
                    epoch = ticket.epoch,
                    current_epoch = state.epoch,
                    "Discarding fetch from before rewind"
                );
                return Ok(None);
            }
            state.cursor = ticket.index.next();
        }

        for (key, bytes) in segment.into_parts() {
            deliver(key, ticket.index, bytes);
        }

        Ok(Some(FetchedSegment {
            requested_by: ticket.requested_by,
            segment: ticket.index,
        }))
    }

    /// Fetch the segment at the cursor in one call.
    pub async fn fetch<F>(
        &self,
        requested_by: CameraIndex,
        deliver: F,
    ) -> Result<Option<FetchedSegment>, FetchError>
    where
        F: FnMut(EntityKey, SegmentIndex, Bytes),
    {
        let ticket = self.begin(requested_by)?;
        let result = self.retrieve(&ticket).await;
        self.complete(ticket, result, deliver)
    }
}

impl std::fmt::Debug for SegmentFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SegmentFetcher")
            .field("source", &self.source.describe())
            .field("layout", &self.layout)
            .field("cursor", &state.cursor)
            .field("epoch", &state.epoch)
            .field("in_flight", &state.in_flight)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySegmentSource;

    fn blob(layout: BlobLayout, tag: &str) -> Bytes {
        let cameras: Vec<Bytes> = CameraIndex::all(layout.camera_count())
            .map(|c| Bytes::from(format!("{tag}-c{c}")))
            .collect();
        let audio = Bytes::from(format!("{tag}-a"));
        layout
            .encode(&cameras, layout.has_audio().then_some(&audio))
            .unwrap()
    }

    fn fetcher_with(count: u64) -> SegmentFetcher {
        let layout = BlobLayout::new(2, true);
        let source: MemorySegmentSource = (0..count)
            .map(|i| (SegmentIndex::new(i), blob(layout, &format!("s{i}"))))
            .collect();
        SegmentFetcher::new(Arc::new(source), layout)
    }

    #[tokio::test]
    async fn delivers_every_entity_and_advances() {
        let fetcher = fetcher_with(3);
        let mut delivered = Vec::new();

        let fetched = fetcher
            .fetch(CameraIndex::FIRST, |key, idx, bytes| {
                delivered.push((key, idx, bytes))
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched.segment, SegmentIndex::ZERO);
        assert_eq!(fetched.requested_by, CameraIndex::FIRST);
        assert_eq!(fetcher.cursor(), SegmentIndex::new(1));
        assert!(!fetcher.is_fetching());

        assert_eq!(delivered.len(), 3);
        assert_eq!(delivered[1].0, EntityKey::Camera(CameraIndex::new(2).unwrap()));
        assert_eq!(delivered[1].2, Bytes::from_static(b"s0-c2"));
        assert_eq!(delivered[2].0, EntityKey::Audio);
        assert_eq!(delivered[2].2, Bytes::from_static(b"s0-a"));
    }

    #[tokio::test]
    async fn second_begin_is_refused_while_in_flight() {
        let fetcher = fetcher_with(1);
        let ticket = fetcher.begin(CameraIndex::FIRST).unwrap();
        assert!(fetcher.is_fetching());
        assert!(matches!(
            fetcher.begin(CameraIndex::FIRST),
            Err(FetchError::AlreadyFetching)
        ));
        drop(ticket);
        assert!(!fetcher.is_fetching());
    }

    #[tokio::test]
    async fn failure_releases_the_flag_and_keeps_the_cursor() {
        let fetcher = fetcher_with(0);
        let err = fetcher
            .fetch(CameraIndex::FIRST, |_, _, _| panic!("nothing to deliver"))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::NotFound(_)));
        assert!(!fetcher.is_fetching());
        assert_eq!(fetcher.cursor(), SegmentIndex::ZERO);
    }

    #[tokio::test]
    async fn malformed_blob_is_a_parse_error() {
        let source = MemorySegmentSource::new();
        source.insert(SegmentIndex::ZERO, Bytes::from_static(&[1, 0]));
        let fetcher = SegmentFetcher::new(Arc::new(source), BlobLayout::new(2, true));

        let err = fetcher.fetch(CameraIndex::FIRST, |_, _, _| {}).await.unwrap_err();
        assert!(matches!(err, FetchError::Parse(_)));
        assert!(!fetcher.is_fetching());
    }

    #[tokio::test]
    async fn rewind_discards_fetches_in_flight() {
        let fetcher = fetcher_with(10);
        let ticket = fetcher.begin(CameraIndex::FIRST).unwrap();
        let result = fetcher.retrieve(&ticket).await;

        fetcher.rewind(SegmentIndex::new(7));

        let outcome = fetcher
            .complete(ticket, result, |_, _, _| panic!("stale delivery"))
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(fetcher.cursor(), SegmentIndex::new(7));
        assert!(!fetcher.is_fetching());

        let fetched = fetcher.fetch(CameraIndex::FIRST, |_, _, _| {}).await.unwrap();
        assert_eq!(fetched.unwrap().segment, SegmentIndex::new(7));
        assert_eq!(fetcher.cursor(), SegmentIndex::new(8));
    }
}
