//! Typed index wrappers for cameras, segments and multiplexed entities.
//!
//! Cameras are numbered from one, segments from zero. Keeping them in
//! separate newtypes stops a segment number from being used where a camera
//! is expected (and vice versa) in the scheduler's task payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// One-based index of a camera feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CameraIndex(u32);

impl CameraIndex {
    /// The camera selected when playback starts.
    pub const FIRST: CameraIndex = CameraIndex(1);

    /// Create a camera index, returning `None` for zero.
    #[must_use]
    pub fn new(index: u32) -> Option<Self> {
        (index >= 1).then_some(Self(index))
    }

    /// The raw one-based number.
    pub fn get(self) -> u32 {
        self.0
    }

    /// The camera `step` positions away, if it lies within `1..=camera_count`.
    #[must_use]
    pub fn step(self, step: i32, camera_count: u32) -> Option<Self> {
        let target = i64::from(self.0) + i64::from(step);
        if target < 1 || target > i64::from(camera_count) {
            return None;
        }
        u32::try_from(target).ok().map(Self)
    }

    /// Signed distance from `self` to `other`.
    pub fn distance_to(self, other: CameraIndex) -> i64 {
        i64::from(other.0) - i64::from(self.0)
    }

    /// Every camera index for a stream with `camera_count` feeds, in order.
    pub fn all(camera_count: u32) -> impl Iterator<Item = CameraIndex> {
        (1..=camera_count).map(CameraIndex)
    }
}

impl TryFrom<u32> for CameraIndex {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| Error::invalid_input("camera index must be at least 1"))
    }
}

impl From<CameraIndex> for u32 {
    fn from(index: CameraIndex) -> Self {
        index.0
    }
}

impl fmt::Display for CameraIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero-based index of a fixed-duration segment.
///
/// Index 0 may carry initialisation data for every entity.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SegmentIndex(u64);

impl SegmentIndex {
    /// The first segment.
    pub const ZERO: SegmentIndex = SegmentIndex(0);

    /// Create a segment index.
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// The raw zero-based number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The following segment.
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// `self - n`, or `None` when that would precede the first segment.
    #[must_use]
    pub fn checked_sub(self, n: u64) -> Option<Self> {
        self.0.checked_sub(n).map(Self)
    }

    /// `self - n`, clamped at the first segment.
    #[must_use]
    pub fn saturating_sub(self, n: u64) -> Self {
        Self(self.0.saturating_sub(n))
    }

    /// `self + offset` for a signed offset, or `None` if it leaves the valid range.
    #[must_use]
    pub fn offset(self, offset: i64) -> Option<Self> {
        self.0.checked_add_signed(offset).map(Self)
    }
}

impl From<u64> for SegmentIndex {
    fn from(index: u64) -> Self {
        Self(index)
    }
}

impl fmt::Display for SegmentIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Addresses one stream inside a multiplexed segment: a camera or the shared audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKey {
    /// Video for one camera.
    Camera(CameraIndex),
    /// The audio track shared by all cameras.
    Audio,
}

impl From<CameraIndex> for EntityKey {
    fn from(camera: CameraIndex) -> Self {
        Self::Camera(camera)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera(camera) => write!(f, "camera {}", camera),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl FromStr for EntityKey {
    type Err = Error;

    /// Parses `audio` or a one-based camera number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("audio") {
            return Ok(Self::Audio);
        }
        let number: u32 = s
            .parse()
            .map_err(|_| Error::invalid_input(format!("unknown entity: {s}")))?;
        CameraIndex::try_from(number).map(Self::Camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_index_rejects_zero() {
        assert!(CameraIndex::new(0).is_none());
        assert!(CameraIndex::try_from(0).is_err());
        assert_eq!(CameraIndex::new(4).unwrap().get(), 4);
    }

    #[test]
    fn camera_step_is_bounded() {
        let first = CameraIndex::FIRST;
        assert_eq!(first.step(-1, 4), None);
        assert_eq!(first.step(3, 4), CameraIndex::new(4));
        assert_eq!(first.step(4, 4), None);
        assert_eq!(CameraIndex::new(3).unwrap().step(-2, 4), Some(first));
    }

    #[test]
    fn camera_distance() {
        let a = CameraIndex::new(2).unwrap();
        let b = CameraIndex::new(5).unwrap();
        assert_eq!(a.distance_to(b), 3);
        assert_eq!(b.distance_to(a), -3);
    }

    #[test]
    fn all_cameras_in_order() {
        let cams: Vec<u32> = CameraIndex::all(3).map(CameraIndex::get).collect();
        assert_eq!(cams, vec![1, 2, 3]);
    }

    #[test]
    fn segment_arithmetic() {
        let idx = SegmentIndex::new(3);
        assert_eq!(idx.next(), SegmentIndex::new(4));
        assert_eq!(idx.checked_sub(4), None);
        assert_eq!(idx.saturating_sub(10), SegmentIndex::ZERO);
        assert_eq!(idx.offset(-1), Some(SegmentIndex::new(2)));
        assert_eq!(idx.offset(-4), None);
    }

    #[test]
    fn entity_key_parse_and_display() {
        assert_eq!("audio".parse::<EntityKey>().unwrap(), EntityKey::Audio);
        let key: EntityKey = "2".parse().unwrap();
        assert_eq!(key, EntityKey::Camera(CameraIndex::new(2).unwrap()));
        assert_eq!(key.to_string(), "camera 2");
        assert!("0".parse::<EntityKey>().is_err());
        assert!("front".parse::<EntityKey>().is_err());
    }

    #[test]
    fn camera_index_serde_validates() {
        let ok: CameraIndex = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
        assert!(serde_json::from_str::<CameraIndex>("0").is_err());
    }
}
