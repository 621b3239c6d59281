//! Shared fixtures for integration tests.
//!
//! Blobs carry recognisable payloads: camera `c` at segment `s` is
//! `c{c}s{s}` and the audio track is `as{s}`.

#![allow(dead_code)]

use bytes::Bytes;
use multivision::config::Config;
use multivision::source::MemorySegmentSource;
use multivision_common::{CameraIndex, SegmentIndex};
use multivision_media::BlobLayout;

pub fn layout(camera_count: u32, has_audio: bool) -> BlobLayout {
    BlobLayout::new(camera_count, has_audio)
}

/// One multiplexed blob for `index`.
pub fn blob(layout: BlobLayout, index: u64) -> Bytes {
    let cameras: Vec<Bytes> = CameraIndex::all(layout.camera_count())
        .map(|camera| Bytes::from(format!("c{}s{}", camera.get(), index)))
        .collect();
    let audio = Bytes::from(format!("as{}", index));
    layout
        .encode(&cameras, layout.has_audio().then_some(&audio))
        .expect("fixture layout matches payloads")
}

/// Source holding blobs `0..segments`.
pub fn memory_source(layout: BlobLayout, segments: u64) -> MemorySegmentSource {
    (0..segments)
        .map(|index| (SegmentIndex::new(index), blob(layout, index)))
        .collect()
}

/// One segment per second, `segments` segments long.
pub fn stream_config(camera_count: u32, has_audio: bool, segments: u64) -> Config {
    let mut config = Config::default();
    config.stream.camera_count = camera_count;
    config.stream.segments_per_second = 1.0;
    config.stream.end_segment = segments;
    if !has_audio {
        config.stream.audio_codec.clear();
    }
    config
}

pub fn camera(index: u32) -> CameraIndex {
    CameraIndex::new(index).expect("camera numbers start at 1")
}
