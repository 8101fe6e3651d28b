use thiserror::Error;

/// Errors surfaced by sinks and configuration loading.
///
/// Timing misuse (an unmatched `stop`) is deliberately not part of this
/// enum: it is reported through the error sink and never propagated.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
