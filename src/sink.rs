//! Text sinks: where reports, marks and diagnostics end up.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;

use crate::config::{TimescopeConfig, DEFAULT_MAX_LOG_BYTES};
use crate::error::Result;

/// Accepts one finished block of text.
pub trait EmitText: Send + Sync {
    fn emit(&self, text: &str) -> Result<()>;
}

impl<T: EmitText + ?Sized> EmitText for Arc<T> {
    fn emit(&self, text: &str) -> Result<()> {
        (**self).emit(text)
    }
}

// ─── TracingSink ─────────────────────────────────────────────────

/// Forwards text to `tracing` at a fixed level, target `timescope`.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn info() -> Self {
        Self::new(Level::INFO)
    }

    pub fn warn() -> Self {
        Self::new(Level::WARN)
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::info()
    }
}

impl EmitText for TracingSink {
    fn emit(&self, text: &str) -> Result<()> {
        match self.level {
            Level::ERROR => tracing::error!(target: "timescope", "{text}"),
            Level::WARN => tracing::warn!(target: "timescope", "{text}"),
            Level::INFO => tracing::info!(target: "timescope", "{text}"),
            Level::DEBUG => tracing::debug!(target: "timescope", "{text}"),
            _ => tracing::trace!(target: "timescope", "{text}"),
        }
        Ok(())
    }
}

// ─── MemorySink ──────────────────────────────────────────────────

/// Keeps every emitted text, e.g. to dump into a page footer or assert on.
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Remove and return everything collected so far.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.messages.lock())
    }
}

impl EmitText for MemorySink {
    fn emit(&self, text: &str) -> Result<()> {
        self.messages.lock().push(text.to_owned());
        Ok(())
    }
}

// ─── FileSink ────────────────────────────────────────────────────

/// Appends each text plus a newline to a log file. A file already larger
/// than `max_bytes` is emptied before the append.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    max_bytes: u64,
    write_lock: Mutex<()>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_bytes: DEFAULT_MAX_LOG_BYTES,
            write_lock: Mutex::new(()),
        }
    }

    /// `None` when the config names no log file.
    pub fn from_config(config: &TimescopeConfig) -> Option<Self> {
        config
            .log_file
            .as_ref()
            .map(|path| Self::new(path).with_max_bytes(config.max_log_bytes))
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empty the log file.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        fs::write(&self.path, "")?;
        Ok(())
    }
}

impl EmitText for FileSink {
    fn emit(&self, text: &str) -> Result<()> {
        let _guard = self.write_lock.lock();

        if let Ok(meta) = fs::metadata(&self.path) {
            if meta.len() > self.max_bytes {
                tracing::debug!(path = %self.path.display(), size = meta.len(), "truncating log file");
                fs::write(&self.path, "")?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

// ─── PrefixedSink ────────────────────────────────────────────────

/// Tags every line of every text with `[<ending> <request id>]` so lines
/// from concurrent requests sharing one log can be told apart.
///
/// An optional context (typically the full request URL) is written once,
/// ahead of the first text.
#[derive(Debug)]
pub struct PrefixedSink<S> {
    inner: S,
    ending: String,
    request_id: String,
    context: Option<String>,
    context_written: AtomicBool,
}

/// Width the ending is padded or truncated to
const ENDING_WIDTH: usize = 12;

impl<S: EmitText> PrefixedSink<S> {
    /// `ending` is a short tail of the request path; the request id is a
    /// fresh UUID.
    pub fn new(inner: S, ending: &str) -> Self {
        Self {
            inner,
            ending: ending.to_owned(),
            request_id: uuid::Uuid::new_v4().simple().to_string(),
            context: None,
            context_written: AtomicBool::new(false),
        }
    }

    /// Line emitted once, prefixed, before the first text.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn prefix(&self) -> String {
        format!(
            "[{:<width$.width$} {}]",
            self.ending,
            self.request_id,
            width = ENDING_WIDTH
        )
    }
}

impl<S: EmitText> EmitText for PrefixedSink<S> {
    fn emit(&self, text: &str) -> Result<()> {
        let prefix = self.prefix();
        let mut out = String::with_capacity(text.len() + prefix.len() + 1);

        if let Some(context) = &self.context {
            if !self.context_written.swap(true, Ordering::SeqCst) {
                out.push_str(&format!("{prefix} {context}\n"));
            }
        }

        if text.is_empty() {
            out.push_str(&prefix);
        } else {
            let lines: Vec<String> = text.lines().map(|line| format!("{prefix} {line}")).collect();
            out.push_str(&lines.join("\n"));
        }

        self.inner.emit(&out)
    }
}

// ─── FanoutSink ──────────────────────────────────────────────────

/// Sends every text to each inner sink. All sinks are tried; the first
/// failure is returned.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EmitText>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EmitText>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn push(&mut self, sink: Arc<dyn EmitText>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EmitText for FanoutSink {
    fn emit(&self, text: &str) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(text) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn temp_log() -> PathBuf {
        std::env::temp_dir().join(format!("timescope-{}.log", uuid::Uuid::new_v4()))
    }

    struct FailingSink;

    impl EmitText for FailingSink {
        fn emit(&self, _text: &str) -> Result<()> {
            Err(Error::Io(std::io::Error::other("sink offline")))
        }
    }

    #[test]
    fn memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        sink.emit("one").unwrap();
        sink.emit("two").unwrap();
        assert_eq!(sink.messages(), ["one", "two"]);
        assert_eq!(sink.drain().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn file_sink_appends_lines() {
        let path = temp_log();
        let sink = FileSink::new(&path);
        sink.emit("first").unwrap();
        sink.emit("second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");

        sink.clear().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn file_sink_truncates_oversized_log() {
        let path = temp_log();
        fs::write(&path, "x".repeat(64)).unwrap();

        let sink = FileSink::new(&path).with_max_bytes(32);
        sink.emit("fresh").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n");

        // Under the cap now, so the next line is appended.
        sink.emit("again").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\nagain\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn file_sink_from_config_requires_a_path() {
        assert!(FileSink::from_config(&TimescopeConfig::default()).is_none());

        let config = TimescopeConfig {
            log_file: Some(PathBuf::from("/tmp/1.log")),
            max_log_bytes: 10,
            ..TimescopeConfig::default()
        };
        let sink = FileSink::from_config(&config).unwrap();
        assert_eq!(sink.path(), Path::new("/tmp/1.log"));
        assert_eq!(sink.max_bytes, 10);
    }

    #[test]
    fn prefix_pads_and_truncates_ending() {
        let short = PrefixedSink::new(MemorySink::new(), "tools.php").with_request_id("r1");
        assert_eq!(short.prefix(), "[tools.php    r1]");

        let long = PrefixedSink::new(MemorySink::new(), "admin-ajax.php?action=x")
            .with_request_id("r2");
        assert_eq!(long.prefix(), "[admin-ajax.p r2]");
    }

    #[test]
    fn prefixed_sink_forwards_tagged_text() {
        let inner = Arc::new(MemorySink::new());
        let sink = PrefixedSink::new(inner.clone(), "cli").with_request_id("abc");
        sink.emit("hello").unwrap();
        assert_eq!(inner.messages(), ["[cli          abc] hello"]);
    }

    #[test]
    fn prefixed_sink_tags_every_line() {
        let inner = Arc::new(MemorySink::new());
        let sink = PrefixedSink::new(inner.clone(), "cache-bench").with_request_id("r1");
        sink.emit("Timing summary for: CLI\nLabel | Count\n-----").unwrap();

        let out = inner.messages();
        assert_eq!(out.len(), 1);
        let lines: Vec<&str> = out[0].lines().collect();
        assert_eq!(
            lines,
            [
                "[cache-bench  r1] Timing summary for: CLI",
                "[cache-bench  r1] Label | Count",
                "[cache-bench  r1] -----",
            ]
        );
    }

    #[test]
    fn prefixed_sink_writes_context_once() {
        let inner = Arc::new(MemorySink::new());
        let sink = PrefixedSink::new(inner.clone(), "admin.php")
            .with_request_id("r2")
            .with_context("https://example.test/wp-admin/admin.php?page=cache-test");
        sink.emit("first").unwrap();
        sink.emit("second").unwrap();

        assert_eq!(
            inner.messages(),
            [
                "[admin.php    r2] https://example.test/wp-admin/admin.php?page=cache-test\n[admin.php    r2] first",
                "[admin.php    r2] second",
            ]
        );
    }

    #[test]
    fn tracing_sink_accepts_every_level() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(TracingSink::new(level).emit("line").is_ok());
        }
    }

    #[test]
    fn default_request_id_is_a_uuid() {
        let sink = PrefixedSink::new(MemorySink::new(), "");
        assert_eq!(sink.request_id().len(), 32);
    }

    #[test]
    fn fanout_tries_every_sink() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new()
            .with(a.clone())
            .with(Arc::new(FailingSink))
            .with(b.clone());

        assert!(fanout.emit("report").is_err());
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

}
