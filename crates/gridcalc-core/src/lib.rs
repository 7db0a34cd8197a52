//! gridcalc-core - directive discovery, comment-preserving codecs, and the
//! processing pipeline that ties them to the formula engine.

pub mod error;
pub mod preamble;
pub mod process;
pub mod sidecar;
pub mod storage;
mod transform;

pub use error::{GridcalcError, Result};
pub use process::{process_file, process_stream, ProcessOptions};

use std::path::Path;

/// Format of input data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Tsv,
}

/// Format of output data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Tsv,
}

impl InputFormat {
    /// Map a file extension to a format: `.csv` and `.tsv` (any case) are
    /// recognized, anything else is an error.
    pub fn from_path(path: &Path) -> Result<InputFormat> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("tsv") => Ok(InputFormat::Tsv),
            _ => Err(GridcalcError::UnknownExtension(
                ext.unwrap_or_default(),
            )),
        }
    }
}

impl OutputFormat {
    /// The output format matching an input format.
    pub fn matching(input: InputFormat) -> OutputFormat {
        match input {
            InputFormat::Csv => OutputFormat::Csv,
            InputFormat::Tsv => OutputFormat::Tsv,
        }
    }
}
