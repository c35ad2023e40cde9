use std::time::{Duration, Instant};

/// Time source and sleep capability.
///
/// The reader loop and reconnect logic take a clock instead of calling
/// `Instant::now` / `thread::sleep` directly, so tests can simulate
/// elapsed time deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// The real thing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
