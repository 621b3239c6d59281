use multivision_media::ByteOrder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub control: ControlConfig,
}

impl Config {
    /// Whether the stream carries a shared audio track.
    pub fn has_audio(&self) -> bool {
        !self.stream.audio_codec.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// Base URL serving `{name}/metadata.json` and `{name}/{index}` blobs
    #[serde(default = "default_host")]
    pub host: String,

    /// Data name (recording) to play
    #[serde(default)]
    pub name: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:8081".to_string()
}
fn default_timeout() -> u64 {
    10
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            name: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Empty when the stream has no audio track
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    #[serde(default = "default_camera_count")]
    pub camera_count: u32,

    #[serde(default = "default_segments_per_second")]
    pub segments_per_second: f64,

    /// First segment index that is never fetched (VOD only)
    #[serde(default)]
    pub end_segment: u64,

    /// Media duration in seconds
    #[serde(default)]
    pub source_duration: f64,

    #[serde(default)]
    pub live_streaming: bool,

    /// Segment a live stream starts from
    #[serde(default)]
    pub initial_segment_number: u64,

    /// Segment offset applied when seeking to a pivot; -1 for encodings that
    /// address segment 0 as "0.1"
    #[serde(default)]
    pub resume_segment_index_offset: i64,

    /// Byte order of the blob header length fields
    #[serde(default)]
    pub byte_order: ByteOrder,
}

fn default_video_codec() -> String {
    "video/mp4; codecs=\"avc1.7A0028\"".to_string()
}
fn default_audio_codec() -> String {
    "audio/mp4; codecs=\"mp4a.40.2\"".to_string()
}
fn default_camera_count() -> u32 {
    1
}
fn default_segments_per_second() -> f64 {
    1.0
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            video_codec: default_video_codec(),
            audio_codec: default_audio_codec(),
            camera_count: default_camera_count(),
            segments_per_second: default_segments_per_second(),
            end_segment: 0,
            source_duration: 0.0,
            live_streaming: false,
            initial_segment_number: 0,
            resume_segment_index_offset: 0,
            byte_order: ByteOrder::default(),
        }
    }
}

/// Buffering and eviction, all in seconds of media.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Look-ahead to accumulate before autoplay, and to keep while playing
    #[serde(default = "default_pre_cache")]
    pub buffer_pre_cache_length: f64,

    /// Width of each purged range and spacing of the purge watermark
    #[serde(default = "default_purge_interval")]
    pub cache_purge_interval: f64,

    /// Already-played media kept behind the playhead
    #[serde(default = "default_preserved")]
    pub purge_preserved_length: f64,
}

fn default_pre_cache() -> f64 {
    5.0
}
fn default_purge_interval() -> f64 {
    5.0
}
fn default_preserved() -> f64 {
    2.0
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            buffer_pre_cache_length: default_pre_cache(),
            cache_purge_interval: default_purge_interval(),
            purge_preserved_length: default_preserved(),
        }
    }
}

/// Camera switching, in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Quiet period after the last camera change before playback resumes
    #[serde(default = "default_freeze_delay")]
    pub freeze_time_delay: f64,

    /// Spacing between queued camera steps
    #[serde(default = "default_change_interval")]
    pub minimum_camera_change_interval: f64,

    /// Added to the target time when a reset forces the playhead
    #[serde(default = "default_reset_nudge")]
    pub reset_seek_nudge: f64,
}

fn default_freeze_delay() -> f64 {
    0.07
}
fn default_change_interval() -> f64 {
    0.03
}
fn default_reset_nudge() -> f64 {
    1.0
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            freeze_time_delay: default_freeze_delay(),
            minimum_camera_change_interval: default_change_interval(),
            reset_seek_nudge: default_reset_nudge(),
        }
    }
}

impl ControlConfig {
    pub fn freeze_delay(&self) -> Duration {
        Duration::from_secs_f64(self.freeze_time_delay.max(0.0))
    }

    pub fn camera_change_interval(&self) -> Duration {
        Duration::from_secs_f64(self.minimum_camera_change_interval.max(0.0))
    }
}
