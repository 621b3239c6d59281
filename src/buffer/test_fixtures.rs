//! Recording sinks and a hand-driven playback surface for scheduler tests.

use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::playback::{BufferSink, PlaybackSurface, SinkError};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkOp {
    Append(Bytes),
    Remove(f64, f64),
    EndOfStream,
}

#[derive(Debug, Default)]
pub struct SinkLog {
    pub ops: Vec<SinkOp>,
    pub updating: bool,
    /// Mutating calls made while a previous one was still pending.
    pub overlaps: usize,
    pub ended: bool,
}

/// Sink that records operations and completes only when told to.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    log: Arc<Mutex<SinkLog>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<SinkOp> {
        self.log.lock().ops.clone()
    }

    pub fn appended(&self) -> Vec<Bytes> {
        self.log
            .lock()
            .ops
            .iter()
            .filter_map(|op| match op {
                SinkOp::Append(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Count appends whose payload equals `tag`.
    pub fn appends_of(&self, tag: &str) -> usize {
        self.appended()
            .iter()
            .filter(|bytes| bytes.as_ref() == tag.as_bytes())
            .count()
    }

    pub fn overlaps(&self) -> usize {
        self.log.lock().overlaps
    }

    pub fn updating(&self) -> bool {
        self.log.lock().updating
    }

    /// Complete the pending operation; returns whether one was pending.
    pub fn finish(&self) -> bool {
        std::mem::replace(&mut self.log.lock().updating, false)
    }

    fn start(&self, op: SinkOp) -> Result<(), SinkError> {
        let mut log = self.log.lock();
        if log.updating {
            log.overlaps += 1;
            return Err(SinkError::Busy);
        }
        log.updating = true;
        log.ended = false;
        log.ops.push(op);
        Ok(())
    }
}

impl BufferSink for RecordingSink {
    fn append(&mut self, data: Bytes) -> Result<(), SinkError> {
        self.start(SinkOp::Append(data))
    }

    fn remove(&mut self, start: f64, end: f64) -> Result<(), SinkError> {
        self.start(SinkOp::Remove(start, end))
    }

    fn is_updating(&self) -> bool {
        self.updating()
    }

    fn end_of_stream(&mut self) -> Result<(), SinkError> {
        let mut log = self.log.lock();
        if log.updating {
            log.overlaps += 1;
            return Err(SinkError::Busy);
        }
        if log.ended {
            return Err(SinkError::Closed);
        }
        log.ended = true;
        log.ops.push(SinkOp::EndOfStream);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SurfaceState {
    pub time: f64,
    pub playing: bool,
    pub muted: bool,
    pub seeks: Vec<f64>,
    pub plays: usize,
    pub pauses: usize,
    pub mutes: usize,
    pub unmutes: usize,
}

/// Surface whose clock only moves when the test sets it.
#[derive(Debug, Clone, Default)]
pub struct ManualSurface {
    state: Arc<Mutex<SurfaceState>>,
}

impl ManualSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_time(&self, time: f64) {
        self.state.lock().time = time;
    }

    pub fn with<R>(&self, f: impl FnOnce(&SurfaceState) -> R) -> R {
        f(&self.state.lock())
    }
}

impl PlaybackSurface for ManualSurface {
    fn current_time(&self) -> f64 {
        self.state.lock().time
    }

    fn set_current_time(&mut self, time: f64) {
        let mut state = self.state.lock();
        state.time = time;
        state.seeks.push(time);
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
        let mut state = self.state.lock();
        state.muted = true;
        state.mutes += 1;
    }

    fn unmute(&mut self) {
        let mut state = self.state.lock();
        state.muted = false;
        state.unmutes += 1;
    }
}
