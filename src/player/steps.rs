//! Throttled queue of camera step requests.
//!
//! Gestures can produce steps faster than switches are worth applying; the
//! player takes one request from this queue per camera-change interval.

use multivision_common::CameraIndex;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRequest {
    /// Move by a signed number of cameras.
    Relative(i32),
    /// Go to a specific camera.
    Absolute(CameraIndex),
}

impl StepRequest {
    /// The step to apply when `current` is on screen.
    pub fn resolve(self, current: CameraIndex) -> i32 {
        match self {
            Self::Relative(step) => step,
            Self::Absolute(target) => {
                let distance = current.distance_to(target);
                i32::try_from(distance).unwrap_or(if distance < 0 { i32::MIN } else { i32::MAX })
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct StepQueue {
    pending: VecDeque<StepRequest>,
    running: bool,
}

impl StepQueue {
    /// Queue a request; returns `true` when the caller must start processing.
    pub fn push(&mut self, request: StepRequest) -> bool {
        self.pending.push_back(request);
        !std::mem::replace(&mut self.running, true)
    }

    /// Next request to apply. Returns `None` and stops once the queue is drained.
    pub fn next(&mut self) -> Option<StepRequest> {
        let next = self.pending.pop_front();
        if next.is_none() {
            self.running = false;
        }
        next
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_push_starts_processing() {
        let mut queue = StepQueue::default();
        assert!(queue.push(StepRequest::Relative(1)));
        assert!(!queue.push(StepRequest::Relative(1)));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.next(), Some(StepRequest::Relative(1)));
        assert_eq!(queue.next(), Some(StepRequest::Relative(1)));
        assert!(queue.is_running());
        assert_eq!(queue.next(), None);
        assert!(!queue.is_running());

        assert!(queue.push(StepRequest::Relative(-1)));
    }

    #[test]
    fn absolute_requests_resolve_against_current_camera() {
        let target = StepRequest::Absolute(CameraIndex::new(2).unwrap());
        assert_eq!(target.resolve(CameraIndex::new(5).unwrap()), -3);
        assert_eq!(target.resolve(CameraIndex::FIRST), 1);
        assert_eq!(target.resolve(CameraIndex::new(2).unwrap()), 0);
    }
}
