use bytes::Bytes;
use multivision_common::SegmentIndex;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::{FetchError, SegmentSource};

/// Reads `{dir}/{index}` blobs from a local directory.
pub struct DirectorySegmentSource {
    dir: PathBuf,
}

impl DirectorySegmentSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Number of consecutive blobs `0, 1, ..` present in the directory.
    pub async fn count_segments(&self) -> u64 {
        let mut count = 0;
        while tokio::fs::try_exists(self.dir.join(count.to_string()))
            .await
            .unwrap_or(false)
        {
            count += 1;
        }
        count
    }
}

#[async_trait::async_trait]
impl SegmentSource for DirectorySegmentSource {
    async fn fetch(&self, index: SegmentIndex) -> Result<Bytes, FetchError> {
        let path = self.dir.join(index.to_string());
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FetchError::NotFound(index)),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
