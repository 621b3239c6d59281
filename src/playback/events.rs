//! Player notifications.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late subscribers (a UI attached after
//! start-up) can catch up.

use chrono::{DateTime, Utc};
use multivision_common::CameraIndex;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// The displayed camera changed.
    CameraChanged { camera: CameraIndex },
    /// No more segments will be fetched.
    Complete,
    /// Enough media was buffered and playback started.
    Autoplay,
    /// Buffers were discarded and playback moved to `time`.
    Reset { time: f64 },
    /// User-visible failure.
    Error { message: String },
}

/// A sequenced, timestamped event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Position in the bus's emission order, starting at 1.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub payload: PlayerEvent,
}

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
    seq: AtomicU64,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
            seq: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn emit(&self, payload: PlayerEvent) {
        let event = Event {
            seq: self.seq.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            payload,
        };

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // Ignore send errors (no subscribers).
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }

    /// Number of events of a given kind in the ring buffer.
    pub fn count(&self, matches: impl Fn(&PlayerEvent) -> bool) -> usize {
        self.recent
            .read()
            .iter()
            .filter(|event| matches(&event.payload))
            .count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
