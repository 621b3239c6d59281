mod metadata;
mod types;

pub use metadata::StreamMetadata;
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./multivision.toml",
        "~/.config/multivision/config.toml",
        "/etc/multivision/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let stream = &config.stream;
    if stream.camera_count == 0 {
        anyhow::bail!("Stream must have at least one camera");
    }
    if !stream.segments_per_second.is_finite() || stream.segments_per_second <= 0.0 {
        anyhow::bail!(
            "Segments per second must be positive, got {}",
            stream.segments_per_second
        );
    }
    if !stream.live_streaming && stream.end_segment == 0 {
        tracing::warn!("VOD stream has end_segment 0; playback will complete immediately");
    }

    let cache = &config.cache;
    if cache.cache_purge_interval <= 0.0 {
        anyhow::bail!(
            "Cache purge interval must be positive, got {}",
            cache.cache_purge_interval
        );
    }
    if cache.purge_preserved_length < 0.0 {
        anyhow::bail!("Purge preserved length cannot be negative");
    }
    if cache.buffer_pre_cache_length < 0.0 {
        anyhow::bail!("Buffer pre-cache length cannot be negative");
    }

    if config.control.freeze_time_delay <= 0.0 {
        anyhow::bail!(
            "Freeze time delay must be positive, got {}",
            config.control.freeze_time_delay
        );
    }
    if config.control.minimum_camera_change_interval < 0.0 {
        anyhow::bail!("Minimum camera change interval cannot be negative");
    }

    if config.source.timeout_secs == 0 {
        anyhow::bail!("Source timeout cannot be 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        validate_config(&config).unwrap();
        assert_eq!(config.cache.buffer_pre_cache_length, 5.0);
        assert_eq!(config.cache.cache_purge_interval, 5.0);
        assert_eq!(config.cache.purge_preserved_length, 2.0);
        assert_eq!(config.control.freeze_time_delay, 0.07);
        assert!(config.has_audio());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [stream]
            camera_count = 4
            byte_order = "big"
            audio_codec = ""
            "#,
        )
        .unwrap();
        assert_eq!(config.stream.camera_count, 4);
        assert_eq!(config.stream.segments_per_second, 1.0);
        assert_eq!(config.stream.byte_order, multivision_media::ByteOrder::Big);
        assert!(!config.has_audio());
        assert_eq!(config.source.host, "http://localhost:8081");
    }

    #[test]
    fn rejects_zero_cameras() {
        let mut config = Config::default();
        config.stream.camera_count = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_bad_rates_and_intervals() {
        let mut config = Config::default();
        config.stream.segments_per_second = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.cache.cache_purge_interval = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.control.freeze_time_delay = 0.0;
        assert!(validate_config(&config).is_err());

        let mut config = Config::default();
        config.source.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
