//! Conversion between playback time and segment index.
//!
//! Every component that maps seconds to segments (fetch look-ahead, purge
//! ranges, freeze pivots, seeks) goes through [`Timeline`] so the mapping is
//! computed one way only.

use multivision_common::SegmentIndex;

use crate::error::{Error, Result};

/// Positions this close to a segment boundary (in segments) snap onto it.
///
/// `index / rate * rate` is not always exactly `index` in floating point;
/// without the snap a boundary time could floor to the previous segment.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Fixed-rate segment timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    segments_per_second: f64,
}

impl Timeline {
    /// Create a timeline with `segments_per_second` segments per second of media.
    pub fn new(segments_per_second: f64) -> Result<Self> {
        if !segments_per_second.is_finite() || segments_per_second <= 0.0 {
            return Err(Error::InvalidRate(segments_per_second));
        }
        Ok(Self {
            segments_per_second,
        })
    }

    /// Segments per second of media.
    pub fn segments_per_second(&self) -> f64 {
        self.segments_per_second
    }

    /// Duration of one segment in seconds.
    pub fn segment_duration(&self) -> f64 {
        1.0 / self.segments_per_second
    }

    /// Segment containing `time`: `floor(time * rate)`, never below zero.
    ///
    /// Negative and non-finite times map to the first segment.
    pub fn index_of(&self, time: f64) -> SegmentIndex {
        if !time.is_finite() || time <= 0.0 {
            return SegmentIndex::ZERO;
        }
        let position = time * self.segments_per_second;
        let nearest = position.round();
        let index = if (position - nearest).abs() < BOUNDARY_EPSILON {
            nearest
        } else {
            position.floor()
        };
        SegmentIndex::new(index as u64)
    }

    /// Start time of `index` in seconds.
    pub fn time_of(&self, index: SegmentIndex) -> f64 {
        index.get() as f64 / self.segments_per_second
    }

    /// Start time of `index + offset`, or zero when that precedes the first segment.
    pub fn time_of_offset(&self, index: SegmentIndex, offset: i64) -> f64 {
        index
            .offset(offset)
            .map(|shifted| self.time_of(shifted))
            .unwrap_or(0.0)
    }
}
