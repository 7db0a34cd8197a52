//! gridcalc - batch table calculator for CSV/TSV files.
//!
//! Reads each input, applies the formulas and scripts found in its leading
//! comment block (and in sidecar files), and writes the result with comment
//! lines preserved. `-` reads standard input.

use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use gridcalc_core::{
    process_file, process_stream, GridcalcError, InputFormat, OutputFormat, ProcessOptions,
};

const STDIN_NAME: &str = "-";

struct CliOptions {
    verbose: bool,
    in_place: bool,
    forced_input: Option<InputFormat>,
    forced_output: Option<OutputFormat>,
    paths: Vec<String>,
}

fn print_usage() {
    eprintln!("Usage: gridcalc [OPTIONS] [FILE]...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]...       .csv/.tsv files to process; '-' reads standard input");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -i, --in-place  Edit file(s) in place");
    eprintln!("      --icsv      Force CSV input format");
    eprintln!("      --itsv      Force TSV input format");
    eprintln!("      --ocsv      Force CSV output format");
    eprintln!("      --otsv      Force TSV output format");
    eprintln!("  -v, --verbose   Report progress on standard error");
    eprintln!("  -c, --colored   Colored output (reserved)");
    eprintln!("  -h, --help      Print help");
}

fn parse_args(args: &[String]) -> CliOptions {
    let mut options = CliOptions {
        verbose: false,
        in_place: false,
        forced_input: None,
        forced_output: None,
        paths: Vec::new(),
    };

    for arg in args {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-v" | "--verbose" => options.verbose = true,
            "-c" | "--colored" => {}
            "-i" | "--in-place" => options.in_place = true,
            "--icsv" => options.forced_input = Some(InputFormat::Csv),
            "--itsv" => options.forced_input = Some(InputFormat::Tsv),
            "--ocsv" => options.forced_output = Some(OutputFormat::Csv),
            "--otsv" => options.forced_output = Some(OutputFormat::Tsv),
            STDIN_NAME => options.paths.push(arg.to_string()),
            flag if flag.starts_with('-') => {
                eprintln!("Error: unknown option: {flag}");
                print_usage();
                std::process::exit(1);
            }
            _ => options.paths.push(arg.to_string()),
        }
    }

    if options.paths.is_empty() {
        options.paths.push(STDIN_NAME.to_string());
    }

    options
}

fn process_stdin(options: &CliOptions) -> Result<(), GridcalcError> {
    if options.in_place {
        return Err(GridcalcError::InPlaceOnStdin);
    }
    let input_format = options.forced_input.ok_or(GridcalcError::FormatRequired)?;
    let output_format = options
        .forced_output
        .unwrap_or_else(|| OutputFormat::matching(input_format));

    let stdin = std::io::stdin();
    let mut reader = stdin.lock();
    let stdout = std::io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    process_stream(
        &mut reader,
        input_format,
        &mut writer,
        output_format,
        &ProcessOptions::default(),
    )?;
    writer.flush()?;
    Ok(())
}

fn process_path(path: &Path, options: &CliOptions) -> Result<(), GridcalcError> {
    let input_format = match options.forced_input {
        Some(format) => format,
        None => InputFormat::from_path(path)?,
    };
    let output_format = options
        .forced_output
        .unwrap_or_else(|| OutputFormat::matching(input_format));

    if options.in_place {
        // Stage the result in a temporary file, then rewrite the original
        // only when the content changed. Truncate-and-write keeps the
        // inode, so hard links stay intact.
        let mut staged = tempfile::NamedTempFile::new()?;
        process_file(
            path,
            input_format,
            &mut staged,
            output_format,
            &ProcessOptions::default(),
        )?;
        staged.flush()?;

        let mut result = Vec::new();
        staged.reopen()?.read_to_end(&mut result)?;
        let original = fs::read(path)?;
        if original == result {
            return Ok(());
        }

        let mut original_file = fs::OpenOptions::new().write(true).truncate(true).open(path)?;
        original_file.write_all(&result)?;
        return Ok(());
    }

    let stdout = std::io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    process_file(
        path,
        input_format,
        &mut writer,
        output_format,
        &ProcessOptions::default(),
    )?;
    writer.flush()?;
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_args(&args);

    for path in &options.paths {
        if options.verbose {
            eprintln!("gridcalc: processing {path}");
        }
        let result = if path == STDIN_NAME {
            process_stdin(&options)
        } else {
            process_path(Path::new(path), &options)
        };
        if let Err(e) = result {
            eprintln!("gridcalc: {path}: {e}");
            std::process::exit(1);
        }
    }
}
