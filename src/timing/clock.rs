use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source: duration since an arbitrary, fixed epoch.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Real clock anchored at construction time.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock. Clones share the same reading, so a test can keep a
/// handle while the accumulator owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, at: Duration) {
        self.nanos.store(at.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set_ms(&self, ms: u64) {
        self.set(Duration::from_millis(ms));
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Milliseconds between two clock readings, clamped at zero.
pub(crate) fn elapsed_ms(from: Duration, to: Duration) -> f64 {
    to.saturating_sub(from).as_nanos() as f64 / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.set_ms(100);
        clock.advance(Duration::from_millis(5));
        assert_eq!(handle.now(), Duration::from_millis(105));
    }

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn elapsed_is_clamped_and_exact_in_ms() {
        assert_eq!(elapsed_ms(Duration::from_millis(150), Duration::from_millis(200)), 50.0);
        assert_eq!(elapsed_ms(Duration::from_millis(200), Duration::from_millis(150)), 0.0);
        assert_eq!(elapsed_ms(Duration::ZERO, Duration::from_micros(1500)), 1.5);
    }
}
