//! Per-entity segment cache.

use bytes::Bytes;
use multivision_common::{CameraIndex, EntityKey, SegmentIndex};
use std::collections::{BTreeMap, HashMap};

/// State of one `(entity, segment)` slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CacheSlot {
    /// Never delivered (or the cache was reset since).
    #[default]
    NotFetched,
    /// Delivered, then evicted by a purge.
    Purged,
    Present(Bytes),
}

impl CacheSlot {
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Present(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Sparse segment storage for every camera and the audio track.
///
/// Slots that are absent from the map are [`CacheSlot::NotFetched`].
#[derive(Debug, Clone)]
pub struct CameraBufferCache {
    entries: HashMap<EntityKey, BTreeMap<SegmentIndex, CacheSlot>>,
}

impl CameraBufferCache {
    pub fn new(camera_count: u32, has_audio: bool) -> Self {
        let mut entries: HashMap<_, _> = CameraIndex::all(camera_count)
            .map(|camera| (EntityKey::Camera(camera), BTreeMap::new()))
            .collect();
        if has_audio {
            entries.insert(EntityKey::Audio, BTreeMap::new());
        }
        Self { entries }
    }

    pub fn has_entity(&self, key: EntityKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Store delivered bytes. Unknown entities are ignored and reported as `false`.
    pub fn store(&mut self, key: EntityKey, index: SegmentIndex, bytes: Bytes) -> bool {
        match self.entries.get_mut(&key) {
            Some(slots) => {
                slots.insert(index, CacheSlot::Present(bytes));
                true
            }
            None => {
                tracing::warn!(entity = %key, segment = %index, "Dropping bytes for unknown entity");
                false
            }
        }
    }

    pub fn slot(&self, key: EntityKey, index: SegmentIndex) -> CacheSlot {
        self.entries
            .get(&key)
            .and_then(|slots| slots.get(&index))
            .cloned()
            .unwrap_or_default()
    }

    pub fn bytes(&self, key: EntityKey, index: SegmentIndex) -> Option<Bytes> {
        self.entries
            .get(&key)
            .and_then(|slots| slots.get(&index))
            .and_then(|slot| slot.bytes().cloned())
    }

    /// Mark every entity's slots in `first..=last` as purged.
    pub fn invalidate_range(&mut self, first: SegmentIndex, last: SegmentIndex) {
        if first > last {
            return;
        }
        for slots in self.entries.values_mut() {
            let mut index = first;
            loop {
                slots.insert(index, CacheSlot::Purged);
                if index == last {
                    break;
                }
                index = index.next();
            }
        }
    }

    /// Forget everything: every slot becomes [`CacheSlot::NotFetched`].
    pub fn reset(&mut self) {
        for slots in self.entries.values_mut() {
            slots.clear();
        }
    }

    /// Highest index holding bytes for `key`.
    pub fn highest_present(&self, key: EntityKey) -> Option<SegmentIndex> {
        self.entries.get(&key).and_then(|slots| {
            slots
                .iter()
                .rev()
                .find(|(_, slot)| matches!(slot, CacheSlot::Present(_)))
                .map(|(index, _)| *index)
        })
    }

    /// Total number of slots holding bytes.
    pub fn present_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(|slots| slots.values())
            .filter(|slot| matches!(slot, CacheSlot::Present(_)))
            .count()
    }

    /// Total bytes held.
    pub fn present_bytes(&self) -> usize {
        self.entries
            .values()
            .flat_map(|slots| slots.values())
            .filter_map(CacheSlot::bytes)
            .map(Bytes::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(n: u32) -> EntityKey {
        EntityKey::Camera(CameraIndex::new(n).unwrap())
    }

    fn seg(n: u64) -> SegmentIndex {
        SegmentIndex::new(n)
    }

    #[test]
    fn slots_start_not_fetched() {
        let cache = CameraBufferCache::new(2, true);
        assert_eq!(cache.slot(cam(1), seg(0)), CacheSlot::NotFetched);
        assert_eq!(cache.slot(EntityKey::Audio, seg(3)), CacheSlot::NotFetched);
        assert!(cache.has_entity(EntityKey::Audio));
    }

    #[test]
    fn audio_key_only_with_audio() {
        let mut cache = CameraBufferCache::new(2, false);
        assert!(!cache.has_entity(EntityKey::Audio));
        assert!(!cache.store(EntityKey::Audio, seg(0), Bytes::from_static(b"a")));
        assert!(!cache.store(cam(3), seg(0), Bytes::from_static(b"x")));
    }

    #[test]
    fn purge_is_distinct_from_not_fetched() {
        let mut cache = CameraBufferCache::new(1, false);
        cache.store(cam(1), seg(2), Bytes::from_static(b"two"));
        cache.store(cam(1), seg(5), Bytes::from_static(b"five"));

        cache.invalidate_range(seg(1), seg(3));

        assert_eq!(cache.slot(cam(1), seg(0)), CacheSlot::NotFetched);
        assert_eq!(cache.slot(cam(1), seg(1)), CacheSlot::Purged);
        assert_eq!(cache.slot(cam(1), seg(2)), CacheSlot::Purged);
        assert_eq!(cache.slot(cam(1), seg(3)), CacheSlot::Purged);
        assert_eq!(cache.slot(cam(1), seg(4)), CacheSlot::NotFetched);
        assert_eq!(cache.bytes(cam(1), seg(5)), Some(Bytes::from_static(b"five")));
    }

    #[test]
    fn invalidate_covers_every_entity() {
        let mut cache = CameraBufferCache::new(2, true);
        for key in [cam(1), cam(2), EntityKey::Audio] {
            cache.store(key, seg(4), Bytes::from_static(b"x"));
        }
        cache.invalidate_range(seg(4), seg(4));
        assert_eq!(cache.present_count(), 0);
        assert_eq!(cache.slot(EntityKey::Audio, seg(4)), CacheSlot::Purged);
    }

    #[test]
    fn reset_clears_purged_markers_too() {
        let mut cache = CameraBufferCache::new(1, true);
        cache.store(cam(1), seg(0), Bytes::from_static(b"x"));
        cache.invalidate_range(seg(1), seg(2));
        cache.reset();
        assert_eq!(cache.slot(cam(1), seg(0)), CacheSlot::NotFetched);
        assert_eq!(cache.slot(cam(1), seg(1)), CacheSlot::NotFetched);
    }

    #[test]
    fn highest_present_skips_purged() {
        let mut cache = CameraBufferCache::new(1, false);
        assert_eq!(cache.highest_present(cam(1)), None);
        cache.store(cam(1), seg(3), Bytes::from_static(b"3"));
        cache.store(cam(1), seg(6), Bytes::from_static(b"6"));
        cache.invalidate_range(seg(6), seg(8));
        assert_eq!(cache.highest_present(cam(1)), Some(seg(3)));
        assert_eq!(cache.present_bytes(), 1);
    }
}
