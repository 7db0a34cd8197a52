//! Hand-off to the records-transformer back-end.
//!
//! `+MLR:` / `+MILLER:` scripts are not interpreted here; they are passed
//! verbatim to the external `mlr` program as `put -e` expressions, with
//! comment lines passed through. Only the extraction and invocation
//! contract lives in this crate.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::error::{GridcalcError, Result};
use crate::{InputFormat, OutputFormat};

fn format_name(input: InputFormat, output: OutputFormat) -> (&'static str, &'static str) {
    let input = match input {
        InputFormat::Csv => "csv",
        InputFormat::Tsv => "tsv",
    };
    let output = match output {
        OutputFormat::Csv => "csv",
        OutputFormat::Tsv => "tsv",
    };
    (input, output)
}

/// Run the transformer scripts over the file at `path`, streaming its
/// output to `writer`.
///
/// A script equal to `exit` ends the collection (or is dropped under
/// `ignore_exit`); with no scripts left, nothing runs and nothing is
/// emitted.
pub(crate) fn run_scripts(
    path: &Path,
    input: InputFormat,
    output: OutputFormat,
    scripts: &[String],
    ignore_exit: bool,
    writer: &mut dyn Write,
) -> Result<()> {
    let mut selected = Vec::new();
    for script in scripts {
        if script == "exit" {
            if ignore_exit {
                continue;
            }
            break;
        }
        selected.push(script.as_str());
    }
    if selected.is_empty() {
        return Ok(());
    }

    let (in_fmt, out_fmt) = format_name(input, output);
    let mut command = Command::new("mlr");
    command
        .arg(format!("--i{in_fmt}"))
        .arg(format!("--o{out_fmt}"))
        .arg("--pass-comments")
        .arg("put");
    for script in selected {
        command.arg("-e").arg(script);
    }
    command.arg(path);

    let result = command
        .output()
        .map_err(|e| GridcalcError::Transform(format!("failed to run mlr: {e}")))?;
    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(GridcalcError::Transform(stderr.trim().to_string()));
    }

    writer.write_all(&result.stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_script_stops_collection() {
        // All scripts after `exit` are dropped, so nothing runs and the
        // output stays empty whether or not mlr is installed.
        let file = tempfile::NamedTempFile::new().unwrap();
        let scripts = vec!["exit".to_string(), "$b = $a".to_string()];
        let mut out = Vec::new();
        run_scripts(
            file.path(),
            InputFormat::Csv,
            OutputFormat::Csv,
            &scripts,
            false,
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_scripts_is_a_noop() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut out = Vec::new();
        run_scripts(
            file.path(),
            InputFormat::Tsv,
            OutputFormat::Tsv,
            &[],
            false,
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());
    }
}
