use std::collections::HashMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::clock::{elapsed_ms, Clock, MonotonicClock};
use super::report::TimingReport;
use super::TimingEntry;
use crate::config::{TimescopeConfig, DEFAULT_LABEL_WIDTH, DEFAULT_RESERVOIR_CAPACITY};
use crate::sink::{EmitText, TracingSink};

/// Per-unit-of-work registry of labeled block timings.
///
/// Call [`start`](Self::start) / [`stop`](Self::stop) around a block (or use
/// [`time`](Self::time)), then [`finish`](Self::finish) once the request or
/// run is done. Not meant to be shared between threads; give each thread or
/// task its own accumulator.
pub struct TimingAccumulator<C: Clock = MonotonicClock> {
    clock: C,
    rng: StdRng,
    capacity: usize,
    label_width: usize,
    /// Entries in first-`start` order
    entries: Vec<TimingEntry>,
    index: HashMap<String, usize>,
    /// Receives unmatched-stop diagnostics
    error_sink: Arc<dyn EmitText>,
}

impl TimingAccumulator<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }

    pub fn from_config(config: &TimescopeConfig) -> Self {
        Self::with_clock_and_config(MonotonicClock::new(), config)
    }
}

impl Default for TimingAccumulator<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimingAccumulator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            rng: StdRng::from_entropy(),
            capacity: DEFAULT_RESERVOIR_CAPACITY,
            label_width: DEFAULT_LABEL_WIDTH,
            entries: Vec::new(),
            index: HashMap::new(),
            error_sink: Arc::new(TracingSink::warn()),
        }
    }

    pub fn with_clock_and_config(clock: C, config: &TimescopeConfig) -> Self {
        let mut acc = Self::with_clock(clock).with_capacity(config.reservoir_capacity);
        acc.label_width = config.label_width.max(1);
        if let Some(seed) = config.seed {
            acc = acc.with_seed(seed);
        }
        acc
    }

    /// Reservoir size per label (minimum 1).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Deterministic sampling, for tests and reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn EmitText>) -> Self {
        self.error_sink = sink;
        self
    }

    /// Begin timing `label`. A second `start` before the matching `stop`
    /// resets the timer.
    pub fn start(&mut self, label: &str) {
        let now = self.clock.now();
        let idx = match self.index.get(label) {
            Some(&idx) => idx,
            None => {
                self.entries.push(TimingEntry::new(label, self.capacity));
                let idx = self.entries.len() - 1;
                self.index.insert(label.to_owned(), idx);
                idx
            }
        };
        self.entries[idx].set_pending(now);
    }

    /// Finish timing `label` and return the measured milliseconds.
    ///
    /// Without a pending `start` this reports one diagnostic to the error
    /// sink, leaves every statistic untouched and returns `None`.
    pub fn stop(&mut self, label: &str) -> Option<f64> {
        let end = self.clock.now();

        let pending = self
            .index
            .get(label)
            .and_then(|&idx| self.entries[idx].take_pending().map(|start| (idx, start)));

        let Some((idx, start)) = pending else {
            self.report_unmatched_stop(label);
            return None;
        };

        let duration = elapsed_ms(start, end);
        self.entries[idx].record(duration, &mut self.rng);
        Some(duration)
    }

    /// Time a closure under `label`.
    pub fn time<T>(&mut self, label: &str, f: impl FnOnce() -> T) -> T {
        self.start(label);
        let out = f();
        self.stop(label);
        out
    }

    pub fn entry(&self, label: &str) -> Option<&TimingEntry> {
        self.index.get(label).map(|&idx| &self.entries[idx])
    }

    /// All entries in first-`start` order.
    pub fn entries(&self) -> impl Iterator<Item = &TimingEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels started but not yet stopped.
    pub fn pending_labels(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.is_pending())
            .map(|e| e.label())
            .collect()
    }

    /// Summary of every label with at least one completed cycle.
    pub fn report(&self, context: &str) -> TimingReport {
        TimingReport::build(context, &self.entries, self.label_width)
    }

    /// End of the unit of work: warn about dangling starts, then hand the
    /// formatted report to `sink` once. Nothing is emitted when no label was
    /// ever started; labels that never completed still get the header.
    pub fn finish(self, sink: &dyn EmitText, context: &str) -> TimingReport {
        for label in self.pending_labels() {
            tracing::warn!(label, "timing block started but never stopped");
        }

        let report = self.report(context);
        if !self.is_empty() {
            if let Err(e) = sink.emit(&report.to_string()) {
                tracing::warn!(error = %e, "failed to emit timing report");
            }
        }
        report
    }

    fn report_unmatched_stop(&self, label: &str) {
        let message = format!("Timing error: stop('{label}') called without a matching start()");
        if let Err(e) = self.error_sink.emit(&message) {
            tracing::warn!(error = %e, label, "failed to emit timing diagnostic");
        }
    }
}
