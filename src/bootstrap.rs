//! Resolve which recording to play and load its `metadata.json`.

use thiserror::Error;

use crate::config::{validate_config, Config, StreamMetadata};
use crate::source::{FetchError, HttpSegmentSource, SegmentSource};

/// Start-up failures. `Display` is the message shown to the viewer.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Please input data name!")]
    MissingName,

    #[error("No data name \"{name}\" found!")]
    NotFound {
        name: String,
        #[source]
        source: FetchError,
    },

    #[error("No data name \"{name}\" found!")]
    InvalidMetadata {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid stream configuration: {0}")]
    InvalidConfig(String),
}

/// A recording ready to play.
pub struct ResolvedStream {
    pub name: String,
    pub config: Config,
    pub source: HttpSegmentSource,
}

/// Pick the data name (`name_override`, then `[source].name`), fetch its
/// metadata from the configured host and overlay it onto `config`.
pub async fn resolve(
    mut config: Config,
    name_override: Option<&str>,
) -> Result<ResolvedStream, BootstrapError> {
    let name = name_override
        .map(str::to_string)
        .or_else(|| config.source.name.clone())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or(BootstrapError::MissingName)?;

    let source = HttpSegmentSource::from_config(&config.source, &name);
    tracing::info!(name = %name, base = %source.describe(), "Loading stream metadata");

    let raw = source
        .fetch_metadata()
        .await
        .map_err(|source| BootstrapError::NotFound {
            name: name.clone(),
            source,
        })?;

    let metadata =
        StreamMetadata::from_json(&raw).map_err(|source| BootstrapError::InvalidMetadata {
            name: name.clone(),
            source,
        })?;
    metadata.apply_to(&mut config);
    config.source.name = Some(name.clone());

    validate_config(&config).map_err(|e| BootstrapError::InvalidConfig(e.to_string()))?;

    tracing::info!(
        name = %name,
        cameras = config.stream.camera_count,
        segments_per_second = config.stream.segments_per_second,
        end_segment = config.stream.end_segment,
        live = config.stream.live_streaming,
        "Stream metadata loaded"
    );

    Ok(ResolvedStream {
        name,
        config,
        source,
    })
}
