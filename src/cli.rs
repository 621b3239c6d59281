use clap::{Parser, Subcommand};
use multivision_common::EntityKey;
use multivision_media::ByteOrder;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multivision")]
#[command(author, version, about = "Multi-camera segment buffering player")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the header and entity slices of a multiplexed segment
    Inspect {
        /// Segment blob to read
        #[arg(required = true)]
        file: PathBuf,

        /// Number of camera feeds in the blob
        #[arg(long, default_value = "1")]
        cameras: u32,

        /// The blob carries no audio track
        #[arg(long)]
        no_audio: bool,

        /// Byte order of the length fields (le or be)
        #[arg(long, default_value = "le")]
        byte_order: ByteOrder,

        /// Write one entity's payload (camera number or "audio") to stdout
        #[arg(long)]
        extract: Option<EntityKey>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a multiplexed segment from per-camera files
    Pack {
        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Camera payloads, in camera order
        #[arg(required = true)]
        cameras: Vec<PathBuf>,

        /// Audio payload
        #[arg(long)]
        audio: Option<PathBuf>,

        /// Byte order of the length fields (le or be)
        #[arg(long, default_value = "le")]
        byte_order: ByteOrder,
    },

    /// Play a recording headlessly and report what the player did
    Simulate {
        /// Data name on the segment server (overrides the config)
        #[arg(long)]
        name: Option<String>,

        /// Play blobs from a local directory instead of the server
        #[arg(long, conflicts_with = "name")]
        dir: Option<PathBuf>,

        /// Wall-clock seconds to play for
        #[arg(long, default_value = "10")]
        seconds: f64,

        /// Request a camera step this often (0 disables switching)
        #[arg(long, default_value = "0")]
        switch_every_ms: u64,

        /// Clock tick of the simulated surface in milliseconds
        #[arg(long, default_value = "250")]
        tick_ms: u64,

        /// Time each sink operation takes in milliseconds
        #[arg(long, default_value = "5")]
        sink_latency_ms: u64,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
