use multivision_common::Track;
use multivision_media::BlobLayout;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{SimulatedSink, SimulatedSurface};
use crate::buffer::Scheduler;
use crate::config::Config;
use crate::fetcher::SegmentFetcher;
use crate::playback::{BufferSink, EventBus};
use crate::player::{Player, PlayerHandle};
use crate::source::SegmentSource;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Time each sink operation takes to complete.
    pub sink_latency: Duration,
    /// Clock resolution of the simulated surface.
    pub tick: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sink_latency: Duration::from_millis(5),
            tick: Duration::from_millis(250),
        }
    }
}

/// A running player wired to simulated sinks and surface.
///
/// The sinks and surface hold weak handles, so dropping the session without
/// calling [`Session::stop`] also ends the player and its clock.
pub struct Session {
    pub handle: PlayerHandle,
    pub events: Arc<EventBus>,
    pub video: SimulatedSink,
    pub audio: Option<SimulatedSink>,
    pub surface: SimulatedSurface,
    player: JoinHandle<()>,
    clock: JoinHandle<()>,
}

impl Session {
    /// Build the pipeline for `config` and start playing from `source`.
    pub fn start(
        config: Config,
        source: Arc<dyn SegmentSource>,
        events: Arc<EventBus>,
        options: SessionOptions,
    ) -> anyhow::Result<Self> {
        let (handle, mailbox) = PlayerHandle::channel();

        let layout = BlobLayout::new(config.stream.camera_count, config.has_audio())
            .with_byte_order(config.stream.byte_order);
        let fetcher = SegmentFetcher::new(source, layout);

        let video = SimulatedSink::new(Track::Video, &handle, options.sink_latency);
        let audio = config
            .has_audio()
            .then(|| SimulatedSink::new(Track::Audio, &handle, options.sink_latency));
        let surface = SimulatedSurface::new(&handle);

        let scheduler = Scheduler::new(
            Arc::new(config),
            fetcher,
            Box::new(surface.clone()),
            Box::new(video.clone()),
            audio
                .clone()
                .map(|sink| Box::new(sink) as Box<dyn BufferSink>),
            events.clone(),
        )?;

        let player = Player::new(scheduler, mailbox).spawn();
        let clock = surface.spawn_clock(options.tick);

        Ok(Self {
            handle,
            events,
            video,
            audio,
            surface,
            player,
            clock,
        })
    }

    /// Stop the clock and the player and wait for the player task to exit.
    pub async fn stop(self) {
        self.clock.abort();
        if self.handle.shutdown().is_err() {
            tracing::debug!("Player already stopped");
        }
        if let Err(e) = self.player.await {
            tracing::warn!(error = %e, "Player task failed");
        }
    }
}
