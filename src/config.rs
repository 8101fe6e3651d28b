use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};

// ─── Defaults ────────────────────────────────────────────────────

/// Samples kept per label for the median estimate
pub const DEFAULT_RESERVOIR_CAPACITY: usize = 1000;

/// Report label column width; longer labels are truncated
pub const DEFAULT_LABEL_WIDTH: usize = 20;

/// Log files above this size are truncated before the next append
pub const DEFAULT_MAX_LOG_BYTES: u64 = 2 * 1024 * 1024;

/// Mark messages shorter than this are right-padded
pub const DEFAULT_MARK_PAD: usize = 20;

// ─── Config ──────────────────────────────────────────────────────

/// Settings shared by the accumulator, the mark timer and the file sink.
///
/// Every field has a default, so `{}` is a valid JSON config.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimescopeConfig {
    /// Reservoir size (K) per label
    #[serde(default = "default_reservoir_capacity")]
    pub reservoir_capacity: usize,

    /// Display width of the label column in reports
    #[serde(default = "default_label_width")]
    pub label_width: usize,

    /// Fixed RNG seed for reproducible sampling; entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Append-only log file used by the file sink, if any
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Size cap for `log_file`
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,

    /// Padding width for mark timer messages
    #[serde(default = "default_mark_pad")]
    pub mark_pad: usize,
}

fn default_reservoir_capacity() -> usize {
    DEFAULT_RESERVOIR_CAPACITY
}
fn default_label_width() -> usize {
    DEFAULT_LABEL_WIDTH
}
fn default_max_log_bytes() -> u64 {
    DEFAULT_MAX_LOG_BYTES
}
fn default_mark_pad() -> usize {
    DEFAULT_MARK_PAD
}

impl Default for TimescopeConfig {
    fn default() -> Self {
        Self {
            reservoir_capacity: DEFAULT_RESERVOIR_CAPACITY,
            label_width: DEFAULT_LABEL_WIDTH,
            seed: None,
            log_file: None,
            max_log_bytes: DEFAULT_MAX_LOG_BYTES,
            mark_pad: DEFAULT_MARK_PAD,
        }
    }
}

impl TimescopeConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `TIMESCOPE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through
    /// `lookup`, so callers (and tests) can supply their own source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("TIMESCOPE_RESERVOIR_CAPACITY") {
            config.reservoir_capacity = parse_var("TIMESCOPE_RESERVOIR_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("TIMESCOPE_LABEL_WIDTH") {
            config.label_width = parse_var("TIMESCOPE_LABEL_WIDTH", &v)?;
        }
        if let Some(v) = lookup("TIMESCOPE_SEED") {
            config.seed = Some(parse_var("TIMESCOPE_SEED", &v)?);
        }
        if let Some(v) = lookup("TIMESCOPE_LOG_FILE") {
            if !v.is_empty() {
                config.log_file = Some(PathBuf::from(v));
            }
        }
        if let Some(v) = lookup("TIMESCOPE_MAX_LOG_BYTES") {
            config.max_log_bytes = parse_var("TIMESCOPE_MAX_LOG_BYTES", &v)?;
        }
        if let Some(v) = lookup("TIMESCOPE_MARK_PAD") {
            config.mark_pad = parse_var("TIMESCOPE_MARK_PAD", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.reservoir_capacity == 0 {
            return Err(Error::Config(
                "reservoir_capacity must be at least 1".into(),
            ));
        }
        if self.label_width == 0 {
            return Err(Error::Config("label_width must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{key}: cannot parse \"{value}\"")))
}
