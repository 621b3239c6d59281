use bytes::Bytes;
use multivision_common::{CameraIndex, EntityKey, SegmentIndex, Track};
use multivision_media::{MultiplexedSegment, Timeline};
use std::sync::Arc;
use std::time::Duration;

use super::cache::{CacheSlot, CameraBufferCache};
use super::freeze::{FreezeMeta, FreezeState};
use super::task::{BufferTask, SegmentRef, TaskQueue};
use crate::config::Config;
use crate::fetcher::{FetchTicket, SegmentFetcher};
use crate::playback::{BufferSink, EventBus, PlaybackSurface, PlayerEvent};
use crate::source::FetchError;

/// Work the scheduler needs its owner to perform asynchronously.
#[derive(Debug)]
pub enum Effect {
    /// Retrieve the segment for this ticket and report back through
    /// [`Scheduler::on_segment_fetched`].
    Fetch(FetchTicket),
    /// (Re)arm the freeze debounce; on expiry call
    /// [`Scheduler::on_freeze_elapsed`] with `generation`. Replaces any
    /// timer armed before.
    ArmFreezeTimer { generation: u64, delay: Duration },
}

/// Sinks with an operation in flight.
#[derive(Debug, Default, Clone, Copy)]
struct Pending {
    video: bool,
    audio: bool,
}

impl Pending {
    fn any(self) -> bool {
        self.video || self.audio
    }

    fn get(self, track: Track) -> bool {
        match track {
            Track::Video => self.video,
            Track::Audio => self.audio,
        }
    }

    fn set(&mut self, track: Track, value: bool) {
        match track {
            Track::Video => self.video = value,
            Track::Audio => self.audio = value,
        }
    }
}

pub struct Scheduler {
    config: Arc<Config>,
    timeline: Timeline,
    fetcher: SegmentFetcher,
    cache: CameraBufferCache,
    queue: TaskQueue,
    video: Box<dyn BufferSink>,
    audio: Option<Box<dyn BufferSink>>,
    surface: Box<dyn PlaybackSurface>,
    events: Arc<EventBus>,

    current_camera: CameraIndex,
    freeze: FreezeState,
    pending: Pending,
    draining: bool,
    purge_trigger_time: f64,
    autoplay_armed: bool,
    caching_completed: bool,
    /// Set while a live stream's initialisation segment is being fetched.
    live_start_pending: bool,
    /// Seeks issued by the scheduler whose `seeking` notification has not arrived yet.
    programmatic_seeks: u32,
    effects: Vec<Effect>,
}

impl Scheduler {
    /// Build a scheduler. `audio` is ignored when the stream has no audio codec.
    pub fn new(
        config: Arc<Config>,
        fetcher: SegmentFetcher,
        surface: Box<dyn PlaybackSurface>,
        video: Box<dyn BufferSink>,
        audio: Option<Box<dyn BufferSink>>,
        events: Arc<EventBus>,
    ) -> multivision_media::Result<Self> {
        let timeline = Timeline::new(config.stream.segments_per_second)?;
        let has_audio = config.has_audio();
        if has_audio && audio.is_none() {
            tracing::warn!("Stream has audio but no audio sink was attached");
        }
        let audio = if has_audio { audio } else { None };

        Ok(Self {
            timeline,
            cache: CameraBufferCache::new(config.stream.camera_count, has_audio),
            queue: TaskQueue::default(),
            purge_trigger_time: config.cache.cache_purge_interval
                + config.cache.purge_preserved_length,
            config,
            fetcher,
            video,
            audio,
            surface,
            events,
            current_camera: CameraIndex::FIRST,
            freeze: FreezeState::default(),
            pending: Pending::default(),
            draining: false,
            autoplay_armed: true,
            caching_completed: false,
            live_start_pending: false,
            programmatic_seeks: 0,
            effects: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn timeline(&self) -> Timeline {
        self.timeline
    }

    pub fn fetcher(&self) -> &SegmentFetcher {
        &self.fetcher
    }

    pub fn cache(&self) -> &CameraBufferCache {
        &self.cache
    }

    pub fn queued(&self) -> impl Iterator<Item = &BufferTask> {
        self.queue.iter()
    }

    pub fn current_camera(&self) -> CameraIndex {
        self.current_camera
    }

    pub fn freeze_meta(&self) -> Option<&FreezeMeta> {
        self.freeze.meta()
    }

    pub fn purge_trigger_time(&self) -> f64 {
        self.purge_trigger_time
    }

    pub fn current_time(&self) -> f64 {
        self.surface.current_time()
    }

    pub fn is_caching_completed(&self) -> bool {
        self.caching_completed
    }

    /// A sink operation is in flight or tasks are waiting.
    pub fn is_busy(&self) -> bool {
        self.pending.any() || !self.queue.is_empty()
    }

    fn is_idle(&self) -> bool {
        !self.pending.any() && !self.draining
    }

    /// Effects requested since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Begin buffering.
    pub fn start(&mut self) {
        let config = Arc::clone(&self.config);
        let stream = &config.stream;
        let initial = SegmentIndex::new(stream.initial_segment_number);

        if stream.live_streaming && initial > SegmentIndex::ZERO {
            let start_time = self.timeline.time_of(initial);
            tracing::info!(segment = %initial, start_time, "Joining live stream");
            self.purge_trigger_time += start_time;
            self.seek(start_time);
            // Segment 0 carries the initialisation data; fetch it before the live edge.
            self.live_start_pending = true;
            self.request_fetch();
        } else {
            tracing::info!(
                cameras = stream.camera_count,
                end_segment = stream.end_segment,
                live = stream.live_streaming,
                "Starting playback buffer"
            );
        }

        self.drain();
    }

    pub fn on_time_update(&mut self) {
        if self.is_idle() {
            self.drain();
        } else {
            self.check_buffer();
        }
    }

    /// The sink for `track` finished its operation.
    pub fn on_sink_update_end(&mut self, track: Track) {
        if !self.pending.get(track) {
            tracing::debug!(%track, "Update end from a sink with nothing pending");
            return;
        }
        self.pending.set(track, false);
        if !self.pending.any() {
            self.drain();
        }
    }

    /// The surface started seeking.
    ///
    /// Seeks issued by the scheduler are expected and ignored; any other seek
    /// came from the user and resets buffering at the new position.
    pub fn on_seeking(&mut self) {
        if self.programmatic_seeks > 0 {
            self.programmatic_seeks -= 1;
            return;
        }
        let time = self.surface.current_time();
        tracing::info!(time, "User seek");
        self.enqueue(BufferTask::Reset { target: time });
    }

    /// Discard everything buffered and restart at `time`.
    pub fn reset_on_time(&mut self, time: f64) {
        self.enqueue(BufferTask::Reset { target: time });
    }

    /// Move `step` cameras away from the current one.
    pub fn change_camera(&mut self, step: i32) {
        let camera_count = self.config.stream.camera_count;
        let target = match self.current_camera.step(step, camera_count) {
            Some(target) if target != self.current_camera => target,
            _ => {
                tracing::debug!(current = %self.current_camera, step, "Camera step ignored");
                return;
            }
        };

        let timeline = self.timeline;
        let surface = &mut self.surface;
        let meta = self.freeze.enter(|| {
            let time = surface.current_time();
            let was_paused = surface.is_paused();
            surface.mute();
            if !was_paused {
                surface.pause();
            }
            FreezeMeta {
                time,
                pivot: timeline.index_of(time),
                was_paused,
            }
        });

        let generation = self.freeze.rearm();
        self.effects.push(Effect::ArmFreezeTimer {
            generation,
            delay: self.config.control.freeze_delay(),
        });

        let previous = std::mem::replace(&mut self.current_camera, target);
        tracing::info!(from = %previous, to = %target, pivot = %meta.pivot, "Camera change");
        self.events.emit(PlayerEvent::CameraChanged { camera: target });

        for task in meta.switch_tasks(target) {
            self.queue.push(task);
        }
        if self.is_idle() {
            self.drain();
        }
    }

    /// The freeze debounce armed with `generation` expired.
    pub fn on_freeze_elapsed(&mut self, generation: u64) {
        match self.freeze.settle(generation) {
            Some(meta) => {
                tracing::debug!(pivot = %meta.pivot, "Camera switch settled");
                self.enqueue(BufferTask::Resume(meta));
            }
            None => tracing::trace!(generation, "Ignoring superseded freeze timer"),
        }
    }

    /// A fetch started through [`Effect::Fetch`] finished.
    pub fn on_segment_fetched(
        &mut self,
        ticket: FetchTicket,
        result: Result<MultiplexedSegment, FetchError>,
    ) {
        let index = ticket.index();
        let cache = &mut self.cache;
        let outcome = self.fetcher.complete(ticket, result, |key, segment, bytes| {
            cache.store(key, segment, bytes);
        });

        let fetched = match outcome {
            Ok(Some(fetched)) => fetched,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(segment = %index, error = %e, "Segment fetch failed");
                return;
            }
        };
        tracing::debug!(segment = %fetched.segment, camera = %fetched.requested_by, "Segment cached");

        if self.live_start_pending {
            self.live_start_pending = false;
            self.fetcher
                .rewind(SegmentIndex::new(self.config.stream.initial_segment_number));
        }

        // Outside a switch the bytes of every camera are cached, so append
        // for whichever camera is on screen now.
        let camera = if self.freeze.is_active() {
            fetched.requested_by
        } else {
            self.current_camera
        };
        self.enqueue(BufferTask::Append(SegmentRef::new(camera, fetched.segment)));
    }

    /// Call `end_of_stream` again once caching is complete and the sinks are idle.
    pub fn end_stream_if_complete(&mut self) {
        if self.caching_completed && !self.is_busy() {
            self.end_stream();
        }
    }

    fn enqueue(&mut self, task: BufferTask) {
        self.queue.push(task);
        if self.is_idle() {
            self.drain();
        }
    }

    fn drain(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;

        while !self.pending.any() {
            match self.queue.pop() {
                Some(task) => self.execute(task),
                None => {
                    self.check_buffer();
                    if self.queue.is_empty() {
                        break;
                    }
                }
            }
        }

        self.draining = false;
    }

    fn execute(&mut self, task: BufferTask) {
        tracing::trace!(task = task.kind(), "Running task");
        match task {
            BufferTask::Append(target) => self.run_append(target),
            BufferTask::CameraChange(target) => self.run_camera_change(target),
            BufferTask::Purge { trigger_time } => self.run_purge(trigger_time),
            BufferTask::Resume(meta) => self.run_resume(meta),
            BufferTask::Reset { target } => self.run_reset(target),
        }
    }

    /// Resolve a task's segment, or `None` when it must be skipped.
    fn resolve(&self, target: SegmentRef, kind: &str) -> Option<SegmentIndex> {
        let Some(segment) = target.segment else {
            tracing::warn!(camera = %target.camera, task = kind, "No such segment; skipping");
            return None;
        };
        if target.camera != self.current_camera {
            tracing::debug!(%target, current = %self.current_camera, task = kind, "Skipping stale task");
            return None;
        }
        Some(segment)
    }

    fn run_append(&mut self, target: SegmentRef) {
        let Some(segment) = self.resolve(target, "append") else {
            return;
        };

        let video = self.cached(EntityKey::Camera(target.camera), segment);
        self.push_bytes(Track::Video, video);

        if !self.freeze.is_active() && self.audio.is_some() {
            let audio = self.cached(EntityKey::Audio, segment);
            self.push_bytes(Track::Audio, audio);
        }
    }

    fn run_camera_change(&mut self, target: SegmentRef) {
        let Some(segment) = self.resolve(target, "camera_change") else {
            return;
        };

        let video = self.cached(EntityKey::Camera(target.camera), segment);
        self.push_bytes(Track::Video, video);

        let time = self
            .timeline
            .time_of_offset(segment, self.config.stream.resume_segment_index_offset);
        self.seek(time);
        tracing::debug!(camera = %target.camera, segment = %segment, time, "Camera pivot applied");
    }

    fn run_purge(&mut self, trigger_time: f64) {
        let remove_end = trigger_time - self.config.cache.purge_preserved_length;
        let remove_start = remove_end - self.config.cache.cache_purge_interval;

        let first = self.timeline.index_of(remove_start);
        let last = self.timeline.index_of(remove_end);
        self.cache.invalidate_range(first, last);
        tracing::debug!(remove_start, remove_end, first = %first, last = %last, "Purging played media");

        if remove_end <= 0.0 {
            return;
        }
        let start = remove_start.max(0.0);
        for track in Track::ALL {
            let sink = match track {
                Track::Video => Some(&mut self.video),
                Track::Audio => self.audio.as_mut(),
            };
            let Some(sink) = sink else { continue };
            match sink.remove(start, remove_end) {
                Ok(()) => self.pending.set(track, true),
                Err(e) => tracing::warn!(%track, error = %e, "Sink rejected remove"),
            }
        }
    }

    fn run_resume(&mut self, meta: FreezeMeta) {
        let camera = self.current_camera;
        let highest = self.cache.highest_present(EntityKey::Camera(camera));

        let mut backfilled = 0usize;
        for segment in meta.backfill(highest) {
            self.queue.push(BufferTask::Append(SegmentRef::new(camera, segment)));
            backfilled += 1;
        }

        let time = self
            .timeline
            .time_of_offset(meta.pivot, self.config.stream.resume_segment_index_offset);
        self.seek(time);
        if !meta.was_paused {
            self.surface.play();
        }
        self.surface.unmute();

        tracing::info!(camera = %camera, pivot = %meta.pivot, backfilled, "Playback resumed");
    }

    fn run_reset(&mut self, target: f64) {
        let dropped = self.queue.clear();
        self.cache.reset();

        let cursor = self.timeline.index_of(target).saturating_sub(1);
        self.fetcher.rewind(cursor);

        self.purge_trigger_time =
            target + self.config.cache.cache_purge_interval + self.config.cache.purge_preserved_length;
        self.autoplay_armed = true;
        self.caching_completed = false;
        self.live_start_pending = false;

        self.seek(target + self.config.control.reset_seek_nudge);
        tracing::info!(target, dropped, cursor = %cursor, "Buffer reset");
        self.events.emit(PlayerEvent::Reset { time: target });
    }

    /// Decide whether to purge, fetch, autoplay or declare completion.
    fn check_buffer(&mut self) {
        if self.caching_completed {
            return;
        }

        let live = self.config.stream.live_streaming;
        let end = SegmentIndex::new(self.config.stream.end_segment);
        if !live && self.fetcher.cursor() >= end {
            if self.is_busy() || self.sinks_updating() {
                tracing::trace!("Deferring completion until sinks settle");
                return;
            }
            self.complete();
            return;
        }

        let now = self.surface.current_time();
        if now > self.purge_trigger_time {
            let trigger_time = self.purge_trigger_time;
            self.purge_trigger_time += self.config.cache.cache_purge_interval;
            self.queue.push(BufferTask::Purge { trigger_time });
        }

        if self.is_busy() || self.fetcher.is_fetching() {
            return;
        }

        let lookahead = self.timeline.time_of(self.fetcher.cursor()) - now;
        if lookahead < self.config.cache.buffer_pre_cache_length {
            self.request_fetch();
        } else if self.autoplay_armed {
            tracing::info!(lookahead, "Pre-cache filled, starting playback");
            self.autoplay();
        }
    }

    fn autoplay(&mut self) {
        self.autoplay_armed = false;
        self.surface.play();
        self.events.emit(PlayerEvent::Autoplay);
    }

    fn request_fetch(&mut self) {
        match self.fetcher.begin(self.current_camera) {
            Ok(ticket) => {
                tracing::trace!(segment = %ticket.index(), "Requesting segment");
                self.effects.push(Effect::Fetch(ticket));
            }
            Err(e) => tracing::debug!(error = %e, "Fetch not started"),
        }
    }

    fn complete(&mut self) {
        self.caching_completed = true;
        tracing::info!(cursor = %self.fetcher.cursor(), "All segments cached");
        self.events.emit(PlayerEvent::Complete);
        self.end_stream();

        // recordings shorter than the pre-cache window never fill it
        if self.autoplay_armed {
            tracing::info!("Starting playback of fully cached stream");
            self.autoplay();
        }
    }

    fn end_stream(&mut self) {
        if let Err(e) = self.video.end_of_stream() {
            tracing::warn!(track = %Track::Video, error = %e, "end_of_stream failed");
        }
        if let Some(audio) = self.audio.as_mut() {
            if let Err(e) = audio.end_of_stream() {
                tracing::warn!(track = %Track::Audio, error = %e, "end_of_stream failed");
            }
        }
    }

    fn sinks_updating(&self) -> bool {
        self.video.is_updating() || self.audio.as_ref().is_some_and(|a| a.is_updating())
    }

    fn seek(&mut self, time: f64) {
        self.programmatic_seeks += 1;
        self.surface.set_current_time(time);
    }

    /// Bytes for a slot, or an empty buffer when they have not arrived.
    fn cached(&self, key: EntityKey, segment: SegmentIndex) -> Bytes {
        match self.cache.slot(key, segment) {
            CacheSlot::Present(bytes) => bytes,
            slot => {
                tracing::warn!(entity = %key, segment = %segment, ?slot, "Segment missing from cache, appending empty buffer");
                Bytes::new()
            }
        }
    }

    fn push_bytes(&mut self, track: Track, bytes: Bytes) {
        let sink = match track {
            Track::Video => Some(&mut self.video),
            Track::Audio => self.audio.as_mut(),
        };
        let Some(sink) = sink else { return };

        match sink.append(bytes) {
            Ok(()) => self.pending.set(track, true),
            Err(e) => tracing::warn!(%track, error = %e, "Sink rejected append"),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("current_camera", &self.current_camera)
            .field("queued", &self.queue.len())
            .field("pending", &self.pending)
            .field("freeze", &self.freeze.meta())
            .field("purge_trigger_time", &self.purge_trigger_time)
            .field("caching_completed", &self.caching_completed)
            .field("fetcher", &self.fetcher)
            .finish()
    }
}
