//! Single-slot cancellable timer.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Holds at most one pending callback. Arming again aborts the previous one.
#[derive(Debug, Default)]
pub struct DebounceSlot {
    pending: Option<JoinHandle<()>>,
}

impl DebounceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fire` after `delay` unless re-armed or cancelled first.
    pub fn arm<F>(&mut self, delay: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.arm_async(delay, async move { fire() });
    }

    /// Like [`arm`](Self::arm) with an async callback.
    pub fn arm_async<Fut>(&mut self, delay: Duration, fire: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Whether a callback is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DebounceSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
