//! Where multiplexed segment blobs come from.

mod file;
mod http;
mod memory;

pub use file::DirectorySegmentSource;
pub use http::HttpSegmentSource;
pub use memory::MemorySegmentSource;

use bytes::Bytes;
use multivision_common::SegmentIndex;
use thiserror::Error;

/// Errors from retrieving or splitting a segment blob.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("segment {index}: server returned {status}")]
    Status {
        index: SegmentIndex,
        status: reqwest::StatusCode,
    },

    #[error("segment {0} not found")]
    NotFound(SegmentIndex),

    #[error("stream metadata unavailable at {url}: server returned {status}")]
    MetadataUnavailable {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read segment: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed segment blob: {0}")]
    Parse(#[from] multivision_media::Error),

    /// A fetch is already in flight.
    #[error("a fetch is already in progress")]
    AlreadyFetching,
}

/// Retrieves one multiplexed blob per segment index.
#[async_trait::async_trait]
pub trait SegmentSource: Send + Sync {
    async fn fetch(&self, index: SegmentIndex) -> Result<Bytes, FetchError>;

    /// Human-readable origin for logs.
    fn describe(&self) -> String;
}
