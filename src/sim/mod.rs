//! Headless stand-ins for the media pipeline.
//!
//! [`SimulatedSink`] completes each operation after a fixed latency and
//! reports it to the player; [`SimulatedSurface`] keeps a clock that a
//! ticker advances while playing. Both share their state behind an `Arc`, so
//! a clone kept by the caller observes what the player did. [`Session`] wires
//! them to a [`Player`](crate::player::Player).

mod session;

pub use session::{Session, SessionOptions};

use bytes::Bytes;
use multivision_common::Track;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::playback::{BufferSink, PlaybackSurface, SinkError};
use crate::player::{PlayerHandle, WeakPlayerHandle};

#[derive(Debug, Default, Clone)]
pub struct SinkStats {
    pub appends: usize,
    pub removes: usize,
    pub appended_bytes: usize,
    pub end_of_stream: usize,
    /// Operations attempted while another was pending.
    pub overlaps: usize,
    /// Most recent appended payloads, oldest first.
    pub recent: Vec<Bytes>,
}

#[derive(Debug, Default)]
struct SinkState {
    updating: bool,
    ended: bool,
    stats: SinkStats,
}

/// Sink that completes operations asynchronously after `latency`.
#[derive(Debug, Clone)]
pub struct SimulatedSink {
    track: Track,
    handle: WeakPlayerHandle,
    latency: Duration,
    keep_recent: usize,
    state: Arc<Mutex<SinkState>>,
}

impl SimulatedSink {
    pub fn new(track: Track, handle: &PlayerHandle, latency: Duration) -> Self {
        Self {
            track,
            handle: handle.downgrade(),
            latency,
            keep_recent: 64,
            state: Arc::new(Mutex::new(SinkState::default())),
        }
    }

    /// Number of appended payloads kept for inspection.
    #[must_use]
    pub fn keep_recent(mut self, count: usize) -> Self {
        self.keep_recent = count;
        self
    }

    pub fn stats(&self) -> SinkStats {
        self.state.lock().stats.clone()
    }

    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    fn begin(&self, record: impl FnOnce(&mut SinkStats)) -> Result<(), SinkError> {
        {
            let mut state = self.state.lock();
            if state.updating {
                state.stats.overlaps += 1;
                return Err(SinkError::Busy);
            }
            state.updating = true;
            state.ended = false;
            record(&mut state.stats);
        }

        let state = Arc::clone(&self.state);
        let handle = self.handle.clone();
        let track = self.track;
        let latency = self.latency;
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            state.lock().updating = false;
            if handle.sink_update_end(track).is_err() {
                tracing::trace!(%track, "Player gone before sink completion");
            }
        });
        Ok(())
    }
}

impl BufferSink for SimulatedSink {
    fn append(&mut self, data: Bytes) -> Result<(), SinkError> {
        let keep = self.keep_recent;
        self.begin(|stats| {
            stats.appends += 1;
            stats.appended_bytes += data.len();
            if keep > 0 {
                if stats.recent.len() == keep {
                    stats.recent.remove(0);
                }
                stats.recent.push(data);
            }
        })
    }

    fn remove(&mut self, start: f64, end: f64) -> Result<(), SinkError> {
        if end < start {
            return Err(SinkError::Rejected(format!("empty range {start}..{end}")));
        }
        self.begin(|stats| stats.removes += 1)
    }

    fn is_updating(&self) -> bool {
        self.state.lock().updating
    }

    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        let mut state = self.state.lock();
        if state.updating {
            state.stats.overlaps += 1;
            return Err(SinkError::Busy);
        }
        if state.ended {
            return Err(SinkError::Closed);
        }
        state.ended = true;
        state.stats.end_of_stream += 1;
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct SurfaceStats {
    pub time: f64,
    pub playing: bool,
    pub muted: bool,
    pub seeks: usize,
    pub plays: usize,
    pub pauses: usize,
}

/// Surface with a clock driven by [`SimulatedSurface::spawn_clock`].
#[derive(Debug, Clone)]
pub struct SimulatedSurface {
    handle: WeakPlayerHandle,
    state: Arc<Mutex<SurfaceStats>>,
}

impl SimulatedSurface {
    pub fn new(handle: &PlayerHandle) -> Self {
        Self {
            handle: handle.downgrade(),
            state: Arc::new(Mutex::new(SurfaceStats::default())),
        }
    }

    pub fn stats(&self) -> SurfaceStats {
        self.state.lock().clone()
    }

    /// Seek as a user would: move the clock and notify the player.
    pub fn user_seek(&self, time: f64) {
        self.state.lock().time = time;
        let _ = self.handle.seeking();
    }

    /// Advance the clock by `tick` every `tick` while playing and send a
    /// time update either way. Stops once the mailbox closes.
    pub fn spawn_clock(&self, tick: Duration) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                {
                    let mut state = state.lock();
                    if state.playing {
                        state.time += tick.as_secs_f64();
                    }
                }
                if handle.time_update().is_err() {
                    break;
                }
            }
        })
    }
}

impl PlaybackSurface for SimulatedSurface {
    fn current_time(&self) -> f64 {
        self.state.lock().time
    }

    fn set_current_time(&mut self, time: f64) {
        {
            let mut state = self.state.lock();
            state.time = time;
            state.seeks += 1;
        }
        let _ = self.handle.seeking();
    }

    fn play(&mut self) {
        let mut state = self.state.lock();
        state.playing = true;
        state.plays += 1;
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.pauses += 1;
    }

    fn is_paused(&self) -> bool {
        !self.state.lock().playing
    }

    fn mute(&mut self) {
        self.state.lock().muted = true;
    }

    fn unmute(&mut self) {
        self.state.lock().muted = false;
    }
}
