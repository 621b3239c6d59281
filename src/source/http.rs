use bytes::Bytes;
use multivision_common::SegmentIndex;
use reqwest::Client;
use std::time::Duration;

use super::{FetchError, SegmentSource};
use crate::config::SourceConfig;

const METADATA_FILE: &str = "metadata.json";

/// Fetches `{host}/{name}/{index}` over HTTP.
pub struct HttpSegmentSource {
    client: Client,
    base_url: String,
}

impl HttpSegmentSource {
    pub fn new(host: &str, name: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: format!("{}/{}", host.trim_end_matches('/'), name),
        }
    }

    pub fn from_config(config: &SourceConfig, name: &str) -> Self {
        Self::new(&config.host, name, config.timeout())
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GET a path under the recording, returning the body on success and the
    /// status otherwise.
    async fn get(&self, path: &str) -> Result<Result<Bytes, reqwest::StatusCode>, FetchError> {
        let response = self.client.get(self.url(path)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Err(status));
        }

        Ok(Ok(response.bytes().await?))
    }

    /// Fetch `metadata.json` for the recording.
    pub async fn fetch_metadata(&self) -> Result<Bytes, FetchError> {
        self.get(METADATA_FILE)
            .await?
            .map_err(|status| FetchError::MetadataUnavailable {
                url: self.url(METADATA_FILE),
                status,
            })
    }
}

#[async_trait::async_trait]
impl SegmentSource for HttpSegmentSource {
    async fn fetch(&self, index: SegmentIndex) -> Result<Bytes, FetchError> {
        tracing::trace!(segment = %index, "GET segment");
        self.get(&index.to_string())
            .await?
            .map_err(|status| match status {
                reqwest::StatusCode::NOT_FOUND => FetchError::NotFound(index),
                status => FetchError::Status { index, status },
            })
    }

    fn describe(&self) -> String {
        self.base_url.clone()
    }
}
