//! Interfaces to the media pipeline the scheduler drives.
//!
//! Both collaborators are owned by the player and called synchronously from
//! its task. A [`BufferSink`] accepts one mutating operation at a time and
//! reports completion out of band (the owner forwards it to
//! [`PlayerHandle::sink_update_end`](crate::player::PlayerHandle::sink_update_end)).

pub mod events;

use bytes::Bytes;
use thiserror::Error;

pub use events::{Event, EventBus, PlayerEvent};

/// Errors returned synchronously by a [`BufferSink`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// A previous operation has not signalled completion yet.
    #[error("sink is still updating")]
    Busy,

    /// The sink was ended or detached.
    #[error("sink is closed")]
    Closed,

    #[error("sink rejected operation: {0}")]
    Rejected(String),
}

/// Append-only media buffer that processes one operation at a time.
pub trait BufferSink: Send {
    /// Start appending `data`. Completion is signalled asynchronously.
    fn append(&mut self, data: Bytes) -> Result<(), SinkError>;

    /// Start removing buffered media in `[start, end]` seconds.
    fn remove(&mut self, start: f64, end: f64) -> Result<(), SinkError>;

    /// Whether an operation is still pending.
    fn is_updating(&self) -> bool;

    /// Mark the end of the media. Calling this on an ended sink is an error.
    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// The element that plays what the sinks hold.
pub trait PlaybackSurface: Send {
    fn current_time(&self) -> f64;

    /// Seek. The surface reports a `seeking` notification for it like any other seek.
    fn set_current_time(&mut self, time: f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn mute(&mut self);

    fn unmute(&mut self);
}

impl<T: BufferSink + ?Sized> BufferSink for Box<T> {
    fn append(&mut self, data: Bytes) -> Result<(), SinkError> {
        (**self).append(data)
    }

    fn remove(&mut self, start: f64, end: f64) -> Result<(), SinkError> {
        (**self).remove(start, end)
    }

    fn is_updating(&self) -> bool {
        (**self).is_updating()
    }

    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        (**self).end_of_stream()
    }
}

impl<T: PlaybackSurface + ?Sized> PlaybackSurface for Box<T> {
    fn current_time(&self) -> f64 {
        (**self).current_time()
    }

    fn set_current_time(&mut self, time: f64) {
        (**self).set_current_time(time)
    }

    fn play(&mut self) {
        (**self).play()
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn mute(&mut self) {
        (**self).mute()
    }

    fn unmute(&mut self) {
        (**self).unmute()
    }
}
