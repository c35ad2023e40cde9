use std::collections::VecDeque;
use std::time::{Duration, Instant};

use bytes::Bytes;

/// Device-level flow control state plus the FIFO transmit queue.
///
/// Guarded by a mutex in the interface: the send path appends while the
/// reader thread drains on READY signals.
///
/// When flow control is disabled the ready flag stays true after startup
/// and nothing ever queues.
#[derive(Debug)]
pub(crate) struct FlowState {
    enabled: bool,
    ready: bool,
    locked_at: Instant,
    queue: VecDeque<Bytes>,
}

impl FlowState {
    pub fn new(enabled: bool, now: Instant) -> Self {
        Self {
            enabled,
            ready: false,
            locked_at: now,
            queue: VecDeque::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Mark the interface ready to transmit (startup or reconfiguration).
    pub fn mark_ready(&mut self) {
        self.ready = true;
    }

    /// Record a transmission: with flow control enabled the interface is
    /// not ready again until the device signals READY.
    pub fn lock(&mut self, now: Instant) {
        if self.enabled {
            self.ready = false;
            self.locked_at = now;
        }
    }

    /// Restore readiness after a failed transmission.
    pub fn unlock(&mut self) {
        if self.enabled {
            self.ready = true;
        }
    }

    pub fn push(&mut self, payload: Bytes) {
        self.queue.push_back(payload);
    }

    /// Pop the oldest queued payload and mark the interface ready.
    ///
    /// Called on a device READY signal (or the timeout failsafe). The
    /// caller re-sends the returned payload, which locks again.
    pub fn drain_one(&mut self) -> Option<Bytes> {
        self.ready = true;
        self.queue.pop_front()
    }

    /// Whether the ready flag has been down longer than `timeout`.
    pub fn timed_out(&self, now: Instant, timeout: Duration) -> bool {
        self.enabled && !self.ready && now.duration_since(self.locked_at) > timeout
    }

    /// Reset to initial values, abandoning queued payloads. Used on every
    /// transport reopen.
    pub fn reset(&mut self, now: Instant) {
        self.ready = false;
        self.locked_at = now;
        self.queue.clear();
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}
