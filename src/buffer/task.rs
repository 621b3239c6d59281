//! Mutating operations queued against the buffer sinks.

use multivision_common::{CameraIndex, SegmentIndex};
use std::collections::VecDeque;
use std::fmt;

use super::freeze::FreezeMeta;

/// Points at cached bytes; the bytes are looked up when the task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRef {
    pub camera: CameraIndex,
    /// `None` when the segment does not exist (before the first one).
    pub segment: Option<SegmentIndex>,
}

impl SegmentRef {
    pub fn new(camera: CameraIndex, segment: SegmentIndex) -> Self {
        Self {
            camera,
            segment: Some(segment),
        }
    }
}

impl fmt::Display for SegmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment {
            Some(segment) => write!(f, "camera {} segment {}", self.camera, segment),
            None => write!(f, "camera {} segment -", self.camera),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BufferTask {
    /// Push a cached segment of the current camera (plus audio).
    Append(SegmentRef),
    /// Evict played media; carries the purge watermark that triggered it.
    Purge { trigger_time: f64 },
    /// Push the pivot segment of the new camera and seek to it.
    CameraChange(SegmentRef),
    /// Backfill and resume playback after a camera switch settled.
    Resume(FreezeMeta),
    /// Discard the queue and cache and restart buffering at `target`.
    Reset { target: f64 },
}

impl BufferTask {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Append(_) => "append",
            Self::Purge { .. } => "purge",
            Self::CameraChange(_) => "camera_change",
            Self::Resume(_) => "resume",
            Self::Reset { .. } => "reset",
        }
    }
}

/// FIFO of pending tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<BufferTask>,
}

impl TaskQueue {
    pub fn push(&mut self, task: BufferTask) {
        tracing::trace!(task = task.kind(), queued = self.tasks.len() + 1, "Task queued");
        self.tasks.push_back(task);
    }

    pub fn pop(&mut self) -> Option<BufferTask> {
        self.tasks.pop_front()
    }

    /// Drop every pending task, returning how many were discarded.
    pub fn clear(&mut self) -> usize {
        let dropped = self.tasks.len();
        self.tasks.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BufferTask> {
        self.tasks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_and_clear() {
        let mut queue = TaskQueue::default();
        queue.push(BufferTask::Purge { trigger_time: 7.0 });
        queue.push(BufferTask::Reset { target: 3.0 });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|t| t.kind()), Some("purge"));
        assert_eq!(queue.clear(), 1);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn segment_ref_display() {
        let camera = CameraIndex::new(2).unwrap();
        assert_eq!(
            SegmentRef::new(camera, SegmentIndex::new(9)).to_string(),
            "camera 2 segment 9"
        );
        let missing = SegmentRef {
            camera,
            segment: None,
        };
        assert_eq!(missing.to_string(), "camera 2 segment -");
    }
}
