//! The processing pipeline: preamble scan, formula application or script
//! hand-off, comment-preserving re-emission.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use gridcalc_engine::{apply, ApplyOptions};

use crate::error::Result;
use crate::preamble;
use crate::sidecar;
use crate::storage::{read_csv, read_tsv, write_csv, write_tsv};
use crate::transform;
use crate::{InputFormat, OutputFormat};

/// Options for [`process_stream`] and [`process_file`].
///
/// Formulas and scripts seeded here (by sidecars or the caller) run before
/// any found in the input's own preamble.
#[derive(Clone, Debug, Default)]
pub struct ProcessOptions {
    /// Skip `exit` sentinels instead of stopping at them.
    pub ignore_exit: bool,
    /// Formulas to apply in addition to `+TBLFM:` directives.
    pub formulas: Vec<String>,
    /// Scripts to run in addition to `+MLR:` directives.
    pub scripts: Vec<String>,
}

/// Process a stream: scan its preamble for directives, apply formulas (or
/// hand scripts to the transformer back-end), and write the result.
pub fn process_stream(
    reader: &mut dyn Read,
    input_format: InputFormat,
    writer: &mut dyn Write,
    output_format: OutputFormat,
    options: &ProcessOptions,
) -> Result<()> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    process_content(None, &content, input_format, writer, output_format, options)
}

/// Process a file, first merging in any sidecar formulas and scripts. A
/// `.skip` sidecar copies the input through verbatim.
pub fn process_file(
    path: &Path,
    input_format: InputFormat,
    writer: &mut dyn Write,
    output_format: OutputFormat,
    options: &ProcessOptions,
) -> Result<()> {
    let sidecars = sidecar::discover(path);
    if sidecars.skip {
        let content = fs::read(path)?;
        writer.write_all(&content)?;
        return Ok(());
    }

    let mut options = options.clone();
    options.formulas.extend(sidecars.formulas);
    options.scripts.extend(sidecars.scripts);

    let content = fs::read_to_string(path)?;
    process_content(
        Some(path),
        &content,
        input_format,
        writer,
        output_format,
        &options,
    )
}

fn process_content(
    path: Option<&Path>,
    content: &str,
    input_format: InputFormat,
    writer: &mut dyn Write,
    output_format: OutputFormat,
    options: &ProcessOptions,
) -> Result<()> {
    let directives = preamble::scan(content);
    let mut formulas = options.formulas.clone();
    formulas.extend(directives.formulas);
    let mut scripts = options.scripts.clone();
    scripts.extend(directives.scripts);

    if formulas.is_empty() && !scripts.is_empty() {
        // The transformer back-end reads from a file; stage stream input.
        return match path {
            Some(path) => transform::run_scripts(
                path,
                input_format,
                output_format,
                &scripts,
                options.ignore_exit,
                writer,
            ),
            None => {
                let mut staged = tempfile::NamedTempFile::new()?;
                staged.write_all(content.as_bytes())?;
                staged.flush()?;
                transform::run_scripts(
                    staged.path(),
                    input_format,
                    output_format,
                    &scripts,
                    options.ignore_exit,
                    writer,
                )
            }
        };
    }

    // With no directives at all this still round-trips the table through
    // the codec, so a formula-free document is emitted unchanged.
    let (mut table, comments) = match input_format {
        InputFormat::Csv => read_csv(content)?,
        InputFormat::Tsv => read_tsv(content),
    };

    apply(
        &mut table,
        &formulas,
        ApplyOptions {
            has_header: true,
            ignore_exit: options.ignore_exit,
        },
    )?;

    match output_format {
        OutputFormat::Csv => write_csv(writer, &table, &comments),
        OutputFormat::Tsv => write_tsv(writer, &table, &comments),
    }
}
