//! The player actor.
//!
//! [`Player`] owns a [`Scheduler`] and runs it on a single tokio task,
//! consuming [`PlayerMessage`]s from its mailbox one at a time. Sinks,
//! surfaces and UI code talk to it through a cloneable [`PlayerHandle`].
//! Collaborators the player itself owns report back through a
//! [`WeakPlayerHandle`], so the player stops once the last external handle
//! is dropped.
//!
//! ```rust,ignore
//! let (handle, mailbox) = PlayerHandle::channel();
//! let video = SimulatedSink::new(Track::Video, &handle, latency);
//! let scheduler = Scheduler::new(config, fetcher, surface, video, audio, events)?;
//! let task = Player::new(scheduler, mailbox).spawn();
//! handle.request_change_camera(1)?;
//! ```

mod debounce;
mod steps;

pub use debounce::DebounceSlot;
pub use steps::{StepQueue, StepRequest};

use multivision_common::{CameraIndex, Error, Result, SegmentIndex, Track};
use multivision_media::MultiplexedSegment;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::buffer::{Effect, Scheduler};
use crate::fetcher::FetchTicket;
use crate::source::FetchError;

/// Everything the player reacts to.
#[derive(Debug)]
pub enum PlayerMessage {
    /// A sink finished its pending operation.
    SinkUpdateEnd(Track),
    /// The surface's clock advanced.
    TimeUpdate,
    /// The surface started seeking.
    Seeking,
    /// Switch cameras now.
    ChangeCamera(i32),
    /// Queue a throttled switch.
    RequestChange(StepRequest),
    /// Discard buffers and restart at a time.
    ResetOnTime(f64),
    /// A spawned fetch finished.
    Fetched {
        ticket: FetchTicket,
        result: std::result::Result<MultiplexedSegment, FetchError>,
    },
    /// The freeze debounce armed with this generation expired.
    FreezeElapsed(u64),
    /// Time to apply the next queued camera step.
    StepTick,
    Status(oneshot::Sender<PlayerStatus>),
    Shutdown,
}

/// Point-in-time view of the player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub current_camera: CameraIndex,
    pub current_time: f64,
    pub fetch_cursor: SegmentIndex,
    pub queued_tasks: usize,
    pub cached_segments: usize,
    pub cached_bytes: usize,
    pub switching: bool,
    pub caching_completed: bool,
}

/// Cloneable sender side of the player's mailbox.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerMessage>,
}

/// Non-owning handle for sinks and surfaces held by the player's scheduler.
#[derive(Debug, Clone)]
pub struct WeakPlayerHandle {
    tx: mpsc::WeakUnboundedSender<PlayerMessage>,
}

impl WeakPlayerHandle {
    pub fn upgrade(&self) -> Option<PlayerHandle> {
        self.tx.upgrade().map(|tx| PlayerHandle { tx })
    }

    fn send(&self, message: PlayerMessage) -> Result<()> {
        self.upgrade().ok_or(Error::Closed)?.send(message)
    }

    pub fn sink_update_end(&self, track: Track) -> Result<()> {
        self.send(PlayerMessage::SinkUpdateEnd(track))
    }

    pub fn time_update(&self) -> Result<()> {
        self.send(PlayerMessage::TimeUpdate)
    }

    pub fn seeking(&self) -> Result<()> {
        self.send(PlayerMessage::Seeking)
    }
}

/// Receiving side, consumed by [`Player::new`].
#[derive(Debug)]
pub struct PlayerMailbox {
    rx: mpsc::UnboundedReceiver<PlayerMessage>,
    tx: mpsc::WeakUnboundedSender<PlayerMessage>,
}

impl PlayerHandle {
    /// Create a handle before the player exists, so sinks and surfaces that
    /// report back to the player can be built first.
    pub fn channel() -> (PlayerHandle, PlayerMailbox) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mailbox = PlayerMailbox {
            rx,
            tx: tx.downgrade(),
        };
        (PlayerHandle { tx }, mailbox)
    }

    pub fn downgrade(&self) -> WeakPlayerHandle {
        WeakPlayerHandle {
            tx: self.tx.downgrade(),
        }
    }

    fn send(&self, message: PlayerMessage) -> Result<()> {
        self.tx.send(message).map_err(|_| Error::Closed)
    }

    pub fn sink_update_end(&self, track: Track) -> Result<()> {
        self.send(PlayerMessage::SinkUpdateEnd(track))
    }

    pub fn time_update(&self) -> Result<()> {
        self.send(PlayerMessage::TimeUpdate)
    }

    pub fn seeking(&self) -> Result<()> {
        self.send(PlayerMessage::Seeking)
    }

    /// Switch `step` cameras immediately.
    pub fn change_camera(&self, step: i32) -> Result<()> {
        self.send(PlayerMessage::ChangeCamera(step))
    }

    /// Queue a switch of `step` cameras, applied at most once per camera-change interval.
    pub fn request_change_camera(&self, step: i32) -> Result<()> {
        self.send(PlayerMessage::RequestChange(StepRequest::Relative(step)))
    }

    /// Queue a switch to `camera`.
    pub fn request_camera(&self, camera: CameraIndex) -> Result<()> {
        self.send(PlayerMessage::RequestChange(StepRequest::Absolute(camera)))
    }

    pub fn reset_on_time(&self, time: f64) -> Result<()> {
        self.send(PlayerMessage::ResetOnTime(time))
    }

    pub async fn status(&self) -> Result<PlayerStatus> {
        let (tx, rx) = oneshot::channel();
        self.send(PlayerMessage::Status(tx))?;
        rx.await.map_err(|_| Error::Closed)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(PlayerMessage::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
impl PlayerMailbox {
    pub(crate) async fn recv(&mut self) -> Option<PlayerMessage> {
        self.rx.recv().await
    }
}

pub struct Player {
    scheduler: Scheduler,
    rx: mpsc::UnboundedReceiver<PlayerMessage>,
    /// Weak so the player does not keep its own mailbox open.
    tx: mpsc::WeakUnboundedSender<PlayerMessage>,
    freeze_timer: DebounceSlot,
    step_timer: DebounceSlot,
    steps: StepQueue,
}

impl Player {
    pub fn new(scheduler: Scheduler, mailbox: PlayerMailbox) -> Self {
        Self {
            scheduler,
            rx: mailbox.rx,
            tx: mailbox.tx,
            freeze_timer: DebounceSlot::new(),
            step_timer: DebounceSlot::new(),
            steps: StepQueue::default(),
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until [`PlayerHandle::shutdown`] or until every strong handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            cameras = self.scheduler.config().stream.camera_count,
            source = %self.scheduler.fetcher().source().describe(),
            "Player started"
        );

        self.scheduler.start();
        self.apply_effects();

        while let Some(message) = self.rx.recv().await {
            if matches!(message, PlayerMessage::Shutdown) {
                break;
            }
            self.handle(message);
            self.apply_effects();
        }

        self.freeze_timer.cancel();
        self.step_timer.cancel();
        tracing::info!("Player stopped");
    }

    fn handle(&mut self, message: PlayerMessage) {
        match message {
            PlayerMessage::SinkUpdateEnd(track) => self.scheduler.on_sink_update_end(track),
            PlayerMessage::TimeUpdate => self.scheduler.on_time_update(),
            PlayerMessage::Seeking => self.scheduler.on_seeking(),
            PlayerMessage::ChangeCamera(step) => self.scheduler.change_camera(step),
            PlayerMessage::RequestChange(request) => {
                if self.steps.push(request) {
                    self.next_step();
                }
            }
            PlayerMessage::StepTick => self.next_step(),
            PlayerMessage::ResetOnTime(time) => self.scheduler.reset_on_time(time),
            PlayerMessage::Fetched { ticket, result } => {
                self.scheduler.on_segment_fetched(ticket, result)
            }
            PlayerMessage::FreezeElapsed(generation) => {
                self.scheduler.on_freeze_elapsed(generation)
            }
            PlayerMessage::Status(reply) => {
                let _ = reply.send(self.status());
            }
            PlayerMessage::Shutdown => {}
        }
    }

    /// Apply one queued step and schedule the next, or finish the burst.
    fn next_step(&mut self) {
        match self.steps.next() {
            Some(request) => {
                let step = request.resolve(self.scheduler.current_camera());
                self.scheduler.change_camera(step);

                let Some(tx) = self.tx.upgrade() else { return };
                let interval = self.scheduler.config().control.camera_change_interval();
                self.step_timer.arm(interval, move || {
                    let _ = tx.send(PlayerMessage::StepTick);
                });
            }
            None => {
                // switches reopen the sinks; close them again if nothing is left to fetch
                self.scheduler.end_stream_if_complete();
            }
        }
    }

    fn apply_effects(&mut self) {
        for effect in self.scheduler.take_effects() {
            let Some(tx) = self.tx.upgrade() else {
                tracing::debug!("Mailbox closed; dropping effect");
                continue;
            };
            match effect {
                Effect::Fetch(ticket) => {
                    let fetcher = self.scheduler.fetcher().clone();
                    tokio::spawn(async move {
                        let result = fetcher.retrieve(&ticket).await;
                        if tx.send(PlayerMessage::Fetched { ticket, result }).is_err() {
                            tracing::debug!("Player gone; dropping fetch result");
                        }
                    });
                }
                Effect::ArmFreezeTimer { generation, delay } => {
                    self.freeze_timer.arm(delay, move || {
                        let _ = tx.send(PlayerMessage::FreezeElapsed(generation));
                    });
                }
            }
        }
    }

    fn status(&self) -> PlayerStatus {
        let cache = self.scheduler.cache();
        PlayerStatus {
            current_camera: self.scheduler.current_camera(),
            current_time: self.scheduler.current_time(),
            fetch_cursor: self.scheduler.fetcher().cursor(),
            queued_tasks: self.scheduler.queued().count(),
            cached_segments: cache.present_count(),
            cached_bytes: cache.present_bytes(),
            switching: self.scheduler.freeze_meta().is_some(),
            caching_completed: self.scheduler.is_caching_completed(),
        }
    }
}
