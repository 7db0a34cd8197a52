//! Error types for the formula engine.

use thiserror::Error;

/// Errors raised while parsing or applying table formulas.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid formula format: {0}")]
    MalformedFormula(String),

    #[error("header column {0:?} not found (no header row, or the name is incorrect)")]
    UnknownHeader(String),

    #[error("column index ${index} is out of range (max columns: {width})")]
    ColumnOutOfRange { index: i64, width: usize },

    #[error("relative column reference ${0} results in a negative index")]
    NegativeColumn(i64),

    #[error("invalid target position {spec:?}: {source}")]
    InvalidTarget {
        spec: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("invalid range endpoint {spec:?}: {source}")]
    InvalidRangeEndpoint {
        spec: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("error evaluating formula {formula} at @{row}${col}: {message}")]
    Eval {
        formula: String,
        row: usize,
        col: usize,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, EngineError>;
