//! Error types for gridcalc core.

use thiserror::Error;

/// Errors that can occur while processing an input.
#[derive(Error, Debug)]
pub enum GridcalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to apply formulas: {0}")]
    Formula(#[from] gridcalc_engine::EngineError),

    #[error("malformed row at line {line}: {message}")]
    Codec { line: usize, message: String },

    #[error("unexpected file extension {0:?}")]
    UnknownExtension(String),

    #[error("cannot use in-place mode with standard input")]
    InPlaceOnStdin,

    #[error("input format must be specified when reading standard input")]
    FormatRequired,

    #[error("records transformer failed: {0}")]
    Transform(String),
}

pub type Result<T> = std::result::Result<T, GridcalcError>;
