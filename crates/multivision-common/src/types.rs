//! Core enums shared by the scheduler and the buffer sinks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which buffer sink a mutating operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// The video sink, fed with the selected camera.
    Video,
    /// The audio sink, fed with the shared audio track.
    Audio,
}

impl Track {
    /// Both tracks, video first.
    pub const ALL: [Track; 2] = [Track::Video, Track::Audio];
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
        }
    }
}
