pub mod accumulator;
pub mod clock;
pub mod mark;
pub mod report;
pub mod reservoir;

pub use accumulator::TimingAccumulator;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use mark::MarkTimer;
pub use report::{ReportRow, TimingReport};
pub use reservoir::{median, Reservoir};

use std::time::Duration;

/// Running statistics for one label.
///
/// Created on the first `start` for its label and updated by every matched
/// `start`/`stop` pair.
#[derive(Debug, Clone)]
pub struct TimingEntry {
    label: String,
    count: u64,
    total_ms: f64,
    min_ms: f64,
    max_ms: f64,
    samples: Reservoir,
    pending_start: Option<Duration>,
}

impl TimingEntry {
    pub(crate) fn new(label: &str, capacity: usize) -> Self {
        Self {
            label: label.to_owned(),
            count: 0,
            total_ms: 0.0,
            min_ms: f64::INFINITY,
            max_ms: 0.0,
            samples: Reservoir::new(capacity),
            pending_start: None,
        }
    }

    /// Fold one completed cycle into the running statistics.
    pub(crate) fn record<R: rand::Rng + ?Sized>(&mut self, duration_ms: f64, rng: &mut R) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.min_ms = self.min_ms.min(duration_ms);
        self.max_ms = self.max_ms.max(duration_ms);
        self.samples.offer(duration_ms, rng);
    }

    pub(crate) fn take_pending(&mut self) -> Option<Duration> {
        self.pending_start.take()
    }

    pub(crate) fn set_pending(&mut self, at: Duration) {
        self.pending_start = Some(at);
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Completed start/stop cycles
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_ms(&self) -> f64 {
        self.total_ms
    }

    /// `+inf` until the first cycle completes
    pub fn min_ms(&self) -> f64 {
        self.min_ms
    }

    pub fn max_ms(&self) -> f64 {
        self.max_ms
    }

    pub fn average_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }

    pub fn median_ms(&self) -> f64 {
        self.samples.median()
    }

    pub fn samples(&self) -> &[f64] {
        self.samples.samples()
    }

    pub fn is_pending(&self) -> bool {
        self.pending_start.is_some()
    }
}
