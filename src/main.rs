mod cli;

use multivision::{
    bootstrap,
    config::{self, Config, StreamMetadata},
    playback::{EventBus, PlayerEvent},
    sim::{Session, SessionOptions},
    source::{DirectorySegmentSource, SegmentSource},
};
use multivision_common::{CameraIndex, EntityKey};
use multivision_media::{BlobLayout, ByteOrder};

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use cli::{Cli, Commands};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

struct SimulateOptions {
    name: Option<String>,
    dir: Option<PathBuf>,
    seconds: f64,
    switch_every: Duration,
    session: SessionOptions,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "multivision=trace,multivision_media=trace,multivision_common=debug,reqwest=debug"
                .to_string()
        } else {
            "multivision=info,multivision_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect {
            file,
            cameras,
            no_audio,
            byte_order,
            extract,
            json,
        } => {
            let layout = BlobLayout::new(cameras, !no_audio).with_byte_order(byte_order);
            inspect_blob(&file, layout, extract, json)
        }
        Commands::Pack {
            out,
            cameras,
            audio,
            byte_order,
        } => pack_blob(&out, &cameras, audio.as_deref(), byte_order),
        Commands::Simulate {
            name,
            dir,
            seconds,
            switch_every_ms,
            tick_ms,
            sink_latency_ms,
        } => {
            if !seconds.is_finite() || seconds <= 0.0 {
                anyhow::bail!("--seconds must be positive");
            }
            if tick_ms == 0 {
                anyhow::bail!("--tick-ms must be positive");
            }
            let options = SimulateOptions {
                name,
                dir,
                seconds,
                switch_every: Duration::from_millis(switch_every_ms),
                session: SessionOptions {
                    sink_latency: Duration::from_millis(sink_latency_ms),
                    tick: Duration::from_millis(tick_ms),
                },
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(simulate(cli.config.as_deref(), options))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("multivision {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn inspect_blob(
    file: &Path,
    layout: BlobLayout,
    extract: Option<EntityKey>,
    json: bool,
) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let blob = std::fs::read(file)
        .map(Bytes::from)
        .with_context(|| format!("Failed to read {:?}", file))?;
    let total = blob.len();
    let segment = layout
        .split(blob)
        .with_context(|| format!("Failed to parse {:?}", file))?;

    if let Some(key) = extract {
        let payload = segment
            .entity(key)
            .with_context(|| format!("Blob has no {}", key))?;
        std::io::stdout().write_all(payload)?;
        return Ok(());
    }

    let header_len = layout.header_len();
    let mut offset = header_len;
    let mut entities = Vec::new();
    for (key, payload) in segment.clone().into_parts() {
        entities.push((key, offset, payload.len()));
        offset += payload.len();
    }

    if json {
        let value = serde_json::json!({
            "file": file.display().to_string(),
            "size": total,
            "byte_order": layout.byte_order().to_string(),
            "header_len": header_len,
            "lengths": segment.lengths(),
            "entities": entities
                .iter()
                .map(|(key, offset, len)| serde_json::json!({
                    "entity": key,
                    "offset": offset,
                    "len": len,
                }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Size: {} bytes", total);
    println!(
        "Header: {} bytes, {} length fields ({} endian)",
        header_len,
        layout.entity_count(),
        layout.byte_order()
    );
    println!("Declared lengths: {:?}", segment.lengths());
    println!("\nEntities: {}", entities.len());
    for (key, offset, len) in &entities {
        println!("  {:<10} offset {:>8}  {:>8} bytes", key.to_string(), offset, len);
    }

    Ok(())
}

fn pack_blob(
    out: &Path,
    cameras: &[PathBuf],
    audio: Option<&Path>,
    byte_order: ByteOrder,
) -> Result<()> {
    let read = |path: &Path| -> Result<Bytes> {
        std::fs::read(path)
            .map(Bytes::from)
            .with_context(|| format!("Failed to read {:?}", path))
    };

    let payloads = cameras
        .iter()
        .map(|path| read(path.as_path()))
        .collect::<Result<Vec<_>>>()?;
    let audio = audio.map(read).transpose()?;

    let camera_count = u32::try_from(payloads.len()).context("Too many camera payloads")?;
    let layout = BlobLayout::new(camera_count, audio.is_some()).with_byte_order(byte_order);
    let blob = layout.encode(&payloads, audio.as_ref())?;

    std::fs::write(out, &blob).with_context(|| format!("Failed to write {:?}", out))?;
    println!(
        "Wrote {} ({} bytes, {} cameras{})",
        out.display(),
        blob.len(),
        camera_count,
        if audio.is_some() { " + audio" } else { "" }
    );
    Ok(())
}

/// Local playback: `{dir}/{index}` blobs plus an optional `{dir}/metadata.json`.
async fn local_stream(mut config: Config, dir: &Path) -> Result<(Config, DirectorySegmentSource)> {
    if !dir.is_dir() {
        anyhow::bail!("Segment directory does not exist: {:?}", dir);
    }

    let metadata_path = dir.join("metadata.json");
    if tokio::fs::try_exists(&metadata_path).await.unwrap_or(false) {
        let raw = tokio::fs::read(&metadata_path)
            .await
            .with_context(|| format!("Failed to read {:?}", metadata_path))?;
        let metadata = StreamMetadata::from_json(&raw)
            .with_context(|| format!("Failed to parse {:?}", metadata_path))?;
        metadata.apply_to(&mut config);
    }

    let source = DirectorySegmentSource::new(dir);
    if !config.stream.live_streaming && config.stream.end_segment == 0 {
        config.stream.end_segment = source.count_segments().await;
        tracing::info!(
            end_segment = config.stream.end_segment,
            "Derived end segment from directory"
        );
    }

    config::validate_config(&config)?;
    Ok((config, source))
}

async fn simulate(config_path: Option<&Path>, options: SimulateOptions) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let events = Arc::new(EventBus::default());

    let (config, source, label): (Config, Arc<dyn SegmentSource>, String) = match &options.dir {
        Some(dir) => {
            let (config, source) = local_stream(config, dir).await?;
            let source: Arc<dyn SegmentSource> = Arc::new(source);
            (config, source, dir.display().to_string())
        }
        None => match bootstrap::resolve(config, options.name.as_deref()).await {
            Ok(resolved) => {
                let source: Arc<dyn SegmentSource> = Arc::new(resolved.source);
                (resolved.config, source, resolved.name)
            }
            Err(e) => {
                events.emit(PlayerEvent::Error {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        },
    };

    let camera_count = config.stream.camera_count;
    println!(
        "Playing {} ({} cameras, {} segments/s{})",
        label,
        camera_count,
        config.stream.segments_per_second,
        if config.stream.live_streaming {
            ", live"
        } else {
            ""
        }
    );

    let session = Session::start(config, source, events.clone(), options.session.clone())?;

    let run_for = Duration::from_secs_f64(options.seconds);
    if options.switch_every.is_zero() || camera_count < 2 {
        tokio::time::sleep(run_for).await;
    } else {
        let deadline = tokio::time::Instant::now() + run_for;
        let mut interval = tokio::time::interval(options.switch_every);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = interval.tick() => {
                    let status = session.handle.status().await?;
                    let next = status.current_camera.get() % camera_count + 1;
                    if let Some(camera) = CameraIndex::new(next) {
                        session.handle.request_camera(camera)?;
                    }
                }
            }
        }
    }

    let status = session.handle.status().await?;
    let video = session.video.stats();
    let audio = session.audio.as_ref().map(|sink| sink.stats());
    let surface = session.surface.stats();
    session.stop().await;

    println!("\nPlayback:");
    println!("  Time: {:.2}s", surface.time);
    println!("  Camera: {}", status.current_camera);
    println!("  Fetch cursor: {}", status.fetch_cursor);
    println!(
        "  Cached: {} segments, {} bytes",
        status.cached_segments, status.cached_bytes
    );
    println!("  Caching completed: {}", status.caching_completed);
    println!("  Seeks: {}, plays: {}, pauses: {}", surface.seeks, surface.plays, surface.pauses);

    println!("\nVideo sink:");
    println!(
        "  Appends: {} ({} bytes), removes: {}, overlaps: {}",
        video.appends, video.appended_bytes, video.removes, video.overlaps
    );
    if let Some(audio) = audio {
        println!("Audio sink:");
        println!(
            "  Appends: {} ({} bytes), removes: {}, overlaps: {}",
            audio.appends, audio.appended_bytes, audio.removes, audio.overlaps
        );
    }

    println!("\nEvents:");
    println!(
        "  Camera changes: {}",
        events.count(|e| matches!(e, PlayerEvent::CameraChanged { .. }))
    );
    println!(
        "  Resets: {}",
        events.count(|e| matches!(e, PlayerEvent::Reset { .. }))
    );
    println!(
        "  Complete: {}",
        events.count(|e| matches!(e, PlayerEvent::Complete)) > 0
    );

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Source: {}", config.source.host);
            if let Some(ref name) = config.source.name {
                println!("  Data name: {}", name);
            }
            println!("  Cameras: {}", config.stream.camera_count);
            println!("  Segments per second: {}", config.stream.segments_per_second);
            println!("  Audio: {}", config.has_audio());
            println!("  Live: {}", config.stream.live_streaming);
            println!(
                "  Pre-cache: {}s, purge every {}s",
                config.cache.buffer_pre_cache_length, config.cache.cache_purge_interval
            );
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Source: {}", config.source.host);
            println!("  Cameras: {}", config.stream.camera_count);
        }
    }

    Ok(())
}
