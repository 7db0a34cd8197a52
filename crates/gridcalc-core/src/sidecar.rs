//! Sidecar file discovery.
//!
//! An input `dir/name.ext` may carry companion files in the same directory:
//!
//! - `name.ext.skip` - suppress all processing, copy the input through;
//! - `name.ext.tblfm` - formulas, split on newlines and `::`;
//! - `name.ext.mlr` - a records-transformer script.
//!
//! Sidecar names may use `%` as a wildcard matching any run of characters
//! (`foo%baz.csv.tblfm` applies to `foo-bar-baz.csv`). Matches are
//! deduplicated and applied in lexicographic path order. Unreadable
//! sidecars are ignored.

use regex::Regex;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Companion inputs discovered next to an input file.
#[derive(Clone, Debug, Default)]
pub struct Sidecars {
    /// A `.skip` sidecar exists; the input must pass through untouched.
    pub skip: bool,
    /// Formulas from `.tblfm` sidecars, in discovery order.
    pub formulas: Vec<String>,
    /// Scripts from `.mlr` sidecars, in discovery order.
    pub scripts: Vec<String>,
}

/// Look for sidecar files next to `input_path`.
pub fn discover(input_path: &Path) -> Sidecars {
    let dir = input_path.parent().unwrap_or_else(|| Path::new("."));
    let Some(target) = input_path.file_name().and_then(|n| n.to_str()) else {
        return Sidecars::default();
    };

    let mut sidecars = Sidecars {
        skip: !find_matching_files(dir, target, ".skip").is_empty(),
        ..Sidecars::default()
    };
    if sidecars.skip {
        return sidecars;
    }

    for path in find_matching_files(dir, target, ".tblfm") {
        if let Ok(content) = fs::read_to_string(&path) {
            sidecars.formulas.extend(split_formulas(&content));
        }
    }
    for path in find_matching_files(dir, target, ".mlr") {
        if let Ok(content) = fs::read_to_string(&path) {
            let script = content.trim();
            if !script.is_empty() {
                sidecars.scripts.push(script.to_string());
            }
        }
    }

    sidecars
}

/// Files in `dir` named `<pattern><suffix>` whose pattern matches `target`,
/// exact names first, then `%` wildcards, deduplicated and sorted.
fn find_matching_files(dir: &Path, target: &str, suffix: &str) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();

    let exact = dir.join(format!("{target}{suffix}"));
    if exact.is_file() {
        found.insert(exact);
    }

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(pattern) = name.strip_suffix(suffix) else {
                continue;
            };
            if match_wildcard(pattern, target) {
                found.insert(entry.path());
            }
        }
    }

    found.into_iter().collect()
}

/// Does `target` match `pattern`, where `%` matches any run of characters?
fn match_wildcard(pattern: &str, target: &str) -> bool {
    if !pattern.contains('%') {
        return pattern == target;
    }
    let regex_pattern = format!("^{}$", regex::escape(pattern).replace('%', ".*"));
    match Regex::new(&regex_pattern) {
        Ok(re) => re.is_match(target),
        Err(_) => false,
    }
}

/// Split sidecar formula content on newlines and `::`, dropping blanks.
fn split_formulas(content: &str) -> Vec<String> {
    content
        .lines()
        .flat_map(|line| line.split("::"))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
