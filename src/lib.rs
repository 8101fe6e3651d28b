//! Accumulative block timing for cache benchmarks and ad-hoc debugging.
//!
//! A [`TimingAccumulator`] aggregates repeated executions of labeled code
//! blocks (count, total, min, max, and a reservoir-sampled median) for one
//! unit of work, then hands a formatted summary to an [`EmitText`] sink once
//! that work is finished.
//!
//! ```
//! use timescope::{MemorySink, TimingAccumulator};
//!
//! let mut timings = TimingAccumulator::new();
//! for _ in 0..3 {
//!     timings.time("parse", || (0..100).sum::<u32>());
//! }
//!
//! let sink = MemorySink::new();
//! let report = timings.finish(&sink, "CLI");
//! assert_eq!(report.rows[0].count, 3);
//! assert_eq!(sink.len(), 1);
//! ```

pub mod config;
pub mod error;
pub mod sink;
pub mod timing;

pub use config::TimescopeConfig;
pub use error::{Error, Result};
pub use sink::{EmitText, FanoutSink, FileSink, MemorySink, PrefixedSink, TracingSink};
pub use timing::{
    median, Clock, ManualClock, MarkTimer, MonotonicClock, Reservoir, ReportRow, TimingAccumulator,
    TimingEntry, TimingReport,
};
