use std::time::Duration;

use super::clock::{elapsed_ms, Clock, MonotonicClock};
use crate::config::DEFAULT_MARK_PAD;
use crate::sink::EmitText;

/// Split timer: each mark reports the time since the previous mark and the
/// time since the timer was created.
///
/// ```text
/// load options         |    1.27 |     1.27
/// Mark 2               |    0.40 |     1.67
/// ```
pub struct MarkTimer<C: Clock = MonotonicClock> {
    clock: C,
    origin: Duration,
    last: Option<Duration>,
    marks: u64,
    pad: usize,
    flip: bool,
}

impl MarkTimer<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for MarkTimer<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MarkTimer<C> {
    pub fn with_clock(clock: C) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            last: None,
            marks: 0,
            pad: DEFAULT_MARK_PAD,
            flip: false,
        }
    }

    pub fn with_pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    /// Put the timings before the message.
    pub fn flipped(mut self, flip: bool) -> Self {
        self.flip = flip;
        self
    }

    /// Record a mark and return its formatted line. An empty message is
    /// replaced by `Mark N`.
    pub fn mark(&mut self, message: &str) -> String {
        let now = self.clock.now();
        let total = elapsed_ms(self.origin, now);
        let elapsed = match self.last {
            Some(last) => elapsed_ms(last, now),
            None => total,
        };
        self.last = Some(now);

        let message = if message.is_empty() {
            self.marks += 1;
            format!("Mark {}", self.marks)
        } else {
            message.to_owned()
        };

        let pad = self.pad;
        if self.flip {
            format!("{elapsed:7.2} | {total:8.2} | {message}")
        } else {
            format!("{message:<pad$} | {elapsed:7.2} | {total:8.2}")
        }
    }

    /// [`mark`](Self::mark) and emit the line to `sink`.
    pub fn mark_to(&mut self, sink: &dyn EmitText, message: &str) -> String {
        let line = self.mark(message);
        if let Err(e) = sink.emit(&line) {
            tracing::warn!(error = %e, "failed to emit mark");
        }
        line
    }
}
