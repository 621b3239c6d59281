//! Segment buffer scheduling.
//!
//! The [`Scheduler`] owns the segment cache, the task queue and the
//! camera-switch state, and is the only code that talks to the buffer sinks.
//! It is synchronous: every entry point is a reaction to one event (sink
//! completion, time update, seek, camera request, fetch result, debounce
//! expiry), and work that must happen later (network fetches, the freeze
//! debounce) is handed back to the caller as [`Effect`]s.

mod cache;
mod freeze;
mod scheduler;
mod task;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use cache::{CacheSlot, CameraBufferCache};
pub use freeze::{FreezeMeta, FreezeState};
pub use scheduler::{Effect, Scheduler};
pub use task::{BufferTask, SegmentRef, TaskQueue};
