//! Camera-switch freeze state.

use multivision_common::{CameraIndex, SegmentIndex};

use super::task::{BufferTask, SegmentRef};

/// Snapshot taken when a switch burst starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezeMeta {
    /// Playback time when the burst started.
    pub time: f64,
    /// Segment at which the switch takes effect.
    pub pivot: SegmentIndex,
    /// Whether playback was paused before the freeze.
    pub was_paused: bool,
}

impl FreezeMeta {
    /// Tasks that move the display to `camera` around the pivot: the segment
    /// before it, the pivot itself, and the one after.
    pub fn switch_tasks(&self, camera: CameraIndex) -> [BufferTask; 3] {
        [
            BufferTask::Append(SegmentRef {
                camera,
                segment: self.pivot.checked_sub(1),
            }),
            BufferTask::CameraChange(SegmentRef::new(camera, self.pivot)),
            BufferTask::Append(SegmentRef::new(camera, self.pivot.next())),
        ]
    }

    /// Segments the new camera needs after the pivot neighbour, up to `highest`.
    pub fn backfill(&self, highest: Option<SegmentIndex>) -> impl Iterator<Item = SegmentIndex> {
        let first = self.pivot.get().saturating_add(2);
        let last = highest.map_or(0, SegmentIndex::get);
        (first..=last).map(SegmentIndex::new)
    }
}

/// Active switch plus a generation counter for the debounce timer.
#[derive(Debug, Default)]
pub struct FreezeState {
    meta: Option<FreezeMeta>,
    generation: u64,
}

impl FreezeState {
    pub fn meta(&self) -> Option<&FreezeMeta> {
        self.meta.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.meta.is_some()
    }

    /// Start a burst if none is active; returns the burst's snapshot.
    pub fn enter(&mut self, capture: impl FnOnce() -> FreezeMeta) -> FreezeMeta {
        *self.meta.get_or_insert_with(capture)
    }

    /// Re-arm the debounce; returns the generation the new timer must carry.
    pub fn rearm(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// End the burst if `generation` is the latest armed timer.
    pub fn settle(&mut self, generation: u64) -> Option<FreezeMeta> {
        if generation != self.generation {
            return None;
        }
        self.meta.take()
    }
}
