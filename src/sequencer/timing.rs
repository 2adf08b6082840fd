// Clock utilities for the recording timeline
// Wall-clock reads are mapped to a timeline that never runs backwards

use crate::sequencer::note::Seconds;
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Source of wall-clock time
pub trait TimeSource {
    /// Current time in seconds since the Unix epoch
    fn now(&self) -> Seconds;

    /// Block the event loop for `seconds`
    fn sleep(&self, seconds: Seconds);
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Seconds {
        chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }

    fn sleep(&self, seconds: Seconds) {
        if seconds > 0.0 && seconds.is_finite() {
            std::thread::sleep(Duration::from_secs_f64(seconds));
        }
    }
}

/// Manually driven clock for tests and offline rendering
///
/// Clones share the same time, so a test can keep one handle and give the
/// other to a controller. `sleep` advances time instead of blocking.
#[derive(Debug, Clone)]
pub struct ManualClock {
    // f64 bits
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Seconds) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start.to_bits())),
        }
    }

    pub fn set(&self, time: Seconds) {
        self.now.store(time.to_bits(), Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: Seconds) {
        self.set(self.now() + seconds);
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> Seconds {
        f64::from_bits(self.now.load(Ordering::Relaxed))
    }

    fn sleep(&self, seconds: Seconds) {
        if seconds > 0.0 {
            self.advance(seconds);
        }
    }
}

/// Monotonic view over a time source
///
/// A read never returns less than the previous read, so a release recorded
/// after an onset can't be stamped earlier when the system clock steps back.
pub struct Clock {
    source: Box<dyn TimeSource>,
    last: Cell<Seconds>,
}

impl Clock {
    pub fn new(source: impl TimeSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            last: Cell::new(f64::NEG_INFINITY),
        }
    }

    pub fn system() -> Self {
        Self::new(SystemClock)
    }

    pub fn now(&self) -> Seconds {
        let now = self.source.now().max(self.last.get());
        self.last.set(now);
        now
    }

    /// Sleep until `deadline` on the underlying source
    pub fn sleep_until(&self, deadline: Seconds) {
        let remaining = deadline - self.now();
        if remaining > 0.0 {
            self.source.sleep(remaining);
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for Clock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clock").field("last", &self.last.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(100.0);
        let other = clock.clone();

        other.advance(0.25);
        assert_eq!(clock.now(), 100.25);

        clock.sleep(1.0);
        assert_eq!(other.now(), 101.25);
    }

    #[test]
    fn test_clock_is_monotonic() {
        let source = ManualClock::new(50.0);
        let clock = Clock::new(source.clone());

        assert_eq!(clock.now(), 50.0);

        // Wall clock steps back
        source.set(49.0);
        assert_eq!(clock.now(), 50.0);

        source.set(51.0);
        assert_eq!(clock.now(), 51.0);
    }

    #[test]
    fn test_sleep_until_advances_manual_clock() {
        let source = ManualClock::new(10.0);
        let clock = Clock::new(source.clone());

        clock.sleep_until(10.5);
        assert_eq!(source.now(), 10.5);

        // Deadline already passed
        clock.sleep_until(10.0);
        assert_eq!(source.now(), 10.5);
    }

    #[test]
    fn test_system_clock_reads_epoch_seconds() {
        let now = SystemClock.now();
        // After 2020-01-01
        assert!(now > 1_577_836_800.0);
    }
}
