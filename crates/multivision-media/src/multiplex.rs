//! Multiplexed segment blobs.
//!
//! One blob carries the same segment index for every camera plus the shared
//! audio track:
//!
//! ```text
//! [u32 len camera 1] .. [u32 len camera N] [u32 len audio]?   header
//! [camera 1 bytes] .. [camera N bytes] [audio bytes]?         payload
//! ```
//!
//! The audio length field is present in the header when the stream has
//! audio, but audio always takes the remainder of the payload after the last
//! camera, whatever its declared length says.

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use multivision_common::{CameraIndex, EntityKey};

use crate::error::{Error, Result};

/// Width of one length field in the header.
const LENGTH_FIELD_SIZE: usize = 4;

/// Byte order of the header's length fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(rename_all = "lowercase"))]
pub enum ByteOrder {
    /// Little-endian, as written by the packaging tool on x86/ARM hosts.
    #[default]
    Little,
    /// Big-endian (network order).
    Big,
}

impl FromStr for ByteOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "le" | "little" => Ok(Self::Little),
            "be" | "big" => Ok(Self::Big),
            other => Err(Error::UnknownByteOrder(other.to_string())),
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Little => write!(f, "little"),
            Self::Big => write!(f, "big"),
        }
    }
}

/// Shape of the blobs for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobLayout {
    camera_count: u32,
    has_audio: bool,
    byte_order: ByteOrder,
}

impl BlobLayout {
    /// Layout with little-endian length fields.
    pub fn new(camera_count: u32, has_audio: bool) -> Self {
        Self {
            camera_count,
            has_audio,
            byte_order: ByteOrder::default(),
        }
    }

    /// Override the header byte order.
    #[must_use]
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn camera_count(&self) -> u32 {
        self.camera_count
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Number of length fields in the header.
    pub fn entity_count(&self) -> usize {
        self.camera_count as usize + usize::from(self.has_audio)
    }

    /// Header size in bytes.
    pub fn header_len(&self) -> usize {
        LENGTH_FIELD_SIZE * self.entity_count()
    }

    /// Split a blob into per-entity slices without copying the payload.
    pub fn split(&self, blob: Bytes) -> Result<MultiplexedSegment> {
        if self.camera_count == 0 {
            return Err(Error::invalid_layout("layout has no cameras"));
        }

        let header_len = self.header_len();
        if blob.len() < header_len {
            return Err(Error::BufferUnderflow {
                need: header_len,
                have: blob.len(),
            });
        }

        let mut header = &blob[..header_len];
        let lengths: Vec<u32> = (0..self.entity_count())
            .map(|_| match self.byte_order {
                ByteOrder::Little => header.get_u32_le(),
                ByteOrder::Big => header.get_u32(),
            })
            .collect();

        let mut cursor = header_len;
        let mut cameras = Vec::with_capacity(self.camera_count as usize);
        for &len in &lengths[..self.camera_count as usize] {
            let end = cursor
                .checked_add(len as usize)
                .filter(|&end| end <= blob.len())
                .ok_or(Error::BufferUnderflow {
                    need: cursor.saturating_add(len as usize),
                    have: blob.len(),
                })?;
            cameras.push(blob.slice(cursor..end));
            cursor = end;
        }

        let audio = self.has_audio.then(|| blob.slice(cursor..));

        Ok(MultiplexedSegment {
            lengths,
            cameras,
            audio,
        })
    }

    /// Build a blob from per-camera payloads and optional audio.
    pub fn encode(&self, cameras: &[Bytes], audio: Option<&Bytes>) -> Result<Bytes> {
        if cameras.len() != self.camera_count as usize {
            return Err(Error::invalid_layout(format!(
                "expected {} camera payloads, got {}",
                self.camera_count,
                cameras.len()
            )));
        }
        if audio.is_some() != self.has_audio {
            return Err(Error::invalid_layout(if self.has_audio {
                "layout requires an audio payload"
            } else {
                "layout has no audio track"
            }));
        }

        let payload_len: usize =
            cameras.iter().map(Bytes::len).sum::<usize>() + audio.map_or(0, Bytes::len);
        let mut out = BytesMut::with_capacity(self.header_len() + payload_len);

        for part in cameras.iter().chain(audio) {
            let len = u32::try_from(part.len())
                .map_err(|_| Error::invalid_layout("payload larger than 4 GiB"))?;
            match self.byte_order {
                ByteOrder::Little => out.put_u32_le(len),
                ByteOrder::Big => out.put_u32(len),
            }
        }
        for part in cameras.iter().chain(audio) {
            out.extend_from_slice(part);
        }

        Ok(out.freeze())
    }
}

/// A blob split into its entities.
#[derive(Debug, Clone)]
pub struct MultiplexedSegment {
    lengths: Vec<u32>,
    cameras: Vec<Bytes>,
    audio: Option<Bytes>,
}

impl MultiplexedSegment {
    /// Length fields as declared in the header (cameras, then audio).
    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    /// Payload for one camera.
    pub fn camera(&self, camera: CameraIndex) -> Option<&Bytes> {
        self.cameras.get(camera.get() as usize - 1)
    }

    /// Audio payload, when the layout has audio.
    pub fn audio(&self) -> Option<&Bytes> {
        self.audio.as_ref()
    }

    /// Payload for any entity.
    pub fn entity(&self, key: EntityKey) -> Option<&Bytes> {
        match key {
            EntityKey::Camera(camera) => self.camera(camera),
            EntityKey::Audio => self.audio(),
        }
    }

    /// Consume into `(entity, bytes)` pairs: cameras in order, then audio.
    pub fn into_parts(self) -> impl Iterator<Item = (EntityKey, Bytes)> {
        let cameras = CameraIndex::all(self.cameras.len() as u32)
            .map(EntityKey::Camera)
            .zip(self.cameras);
        cameras.chain(self.audio.map(|audio| (EntityKey::Audio, audio)))
    }
}
