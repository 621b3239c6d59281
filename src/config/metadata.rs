//! `metadata.json` published next to each recording.

use multivision_media::ByteOrder;
use serde::Deserialize;

use super::Config;

/// Stream description written by the packaging tool.
///
/// Every key is optional; only the keys present override the loaded config.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub camera_count: Option<u32>,
    pub segments_per_second: Option<f64>,
    pub end_segment: Option<u64>,
    pub source_duration: Option<f64>,
    pub live_streaming: Option<bool>,
    pub initial_segment_number: Option<u64>,
    pub resume_segment_index_offset: Option<i64>,
    pub byte_order: Option<ByteOrder>,
    pub buffer_pre_cache_length: Option<f64>,
    pub cache_purge_interval: Option<f64>,
    pub purge_preserved_length: Option<f64>,
    pub freeze_time_delay: Option<f64>,
    pub minimum_camera_change_interval: Option<f64>,
}

impl StreamMetadata {
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Overlay the present keys onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        let stream = &mut config.stream;
        overlay(&mut stream.video_codec, &self.video_codec);
        overlay(&mut stream.audio_codec, &self.audio_codec);
        overlay(&mut stream.camera_count, &self.camera_count);
        overlay(&mut stream.segments_per_second, &self.segments_per_second);
        overlay(&mut stream.end_segment, &self.end_segment);
        overlay(&mut stream.source_duration, &self.source_duration);
        overlay(&mut stream.live_streaming, &self.live_streaming);
        overlay(&mut stream.initial_segment_number, &self.initial_segment_number);
        overlay(
            &mut stream.resume_segment_index_offset,
            &self.resume_segment_index_offset,
        );
        overlay(&mut stream.byte_order, &self.byte_order);

        let cache = &mut config.cache;
        overlay(&mut cache.buffer_pre_cache_length, &self.buffer_pre_cache_length);
        overlay(&mut cache.cache_purge_interval, &self.cache_purge_interval);
        overlay(&mut cache.purge_preserved_length, &self.purge_preserved_length);

        let control = &mut config.control;
        overlay(&mut control.freeze_time_delay, &self.freeze_time_delay);
        overlay(
            &mut control.minimum_camera_change_interval,
            &self.minimum_camera_change_interval,
        );
    }
}

fn overlay<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}
