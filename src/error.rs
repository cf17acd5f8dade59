//! Error types for markswap

use thiserror::Error;

/// Result type alias for markswap operations
pub type Result<T> = std::result::Result<T, MarkswapError>;

/// Error kinds surfaced by the core transforms and the terminal host
#[derive(Error, Debug)]
pub enum MarkswapError {
    #[error("no segment for selection {start}..={end}")]
    RangeNotFound { start: usize, end: usize },

    #[error("malformed markup at byte {offset}: {reason}")]
    MalformedMarkup { offset: usize, reason: &'static str },

    #[error("a reveal is already running")]
    RevealAlreadyActive,

    #[error("document already contains a replacement marker")]
    MarkerAlreadyPresent,

    #[error("document contains no replacement marker")]
    MarkerMissing,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Message(String),
}

impl MarkswapError {
    pub(crate) fn malformed(offset: usize, reason: &'static str) -> Self {
        MarkswapError::MalformedMarkup { offset, reason }
    }
}
