//! Multivision-Media: segment timeline and multiplexed segment blobs
//!
//! # Modules
//!
//! - `timeline` - Time to segment index conversion (the only place it is computed)
//! - `multiplex` - Length-prefixed blobs carrying every camera plus audio
//!
//! # Architecture
//!
//! A recording with N synchronised cameras is cut into fixed-duration
//! segments. For each segment index the packaging step writes one blob that
//! holds that segment for all cameras and the shared audio track, so a
//! single request fetches everything needed to switch cameras instantly.

pub mod error;
pub mod multiplex;
pub mod timeline;

pub use error::{Error, Result};
pub use multiplex::{BlobLayout, ByteOrder, MultiplexedSegment};
pub use timeline::Timeline;
