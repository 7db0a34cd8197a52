//! Regular grammar for targets, references, and ranges.
//!
//! A spec value is an absolute position (`1`, `2`, ...), a relative offset
//! (`-1`, `+2`), an edge anchor (`<`, `<<`, `<<<` from the top, `>`, `>>`,
//! `>>>` from the bottom), or - for columns only - a header name in braces
//! (`{Price}`). A row spec prefixes the value with `@`, a column spec with
//! `$`, and a cell spec is an optional row spec followed by an optional
//! column spec.

use regex::Regex;
use std::sync::OnceLock;

/// Value part of a row/column specification.
const SPEC_VAL: &str = r"[-+]?\d+|<{1,3}|>{1,3}|\{[^}]+\}";

fn cell_spec_pat() -> String {
    format!(r"(?:@(?:{SPEC_VAL}))?(?:\$(?:{SPEC_VAL}))?")
}

/// Formula parser: `$4=$2*$3`, `@3=@2`, `@2$4..@>>$4=$2*$3`.
///
/// Captures: `target` (start cell spec), `end` (optional range end), and
/// `expr` (everything right of `=`).
pub(crate) fn formula_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let cell_spec = cell_spec_pat();
        Regex::new(&format!(
            r"^(?P<target>{cell_spec})(?:\.\.(?P<end>{cell_spec}))?\s*=\s*(?P<expr>.+)$"
        ))
        .expect("formula regex must compile")
    })
}

/// Cell references inside an expression: `@2$3`, `$2`, `$-1`, `${Price}`.
/// The column part is mandatory; the row part is optional.
pub(crate) fn cell_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"(?:@(?P<row>{SPEC_VAL}))?\$(?P<col>{SPEC_VAL})"))
            .expect("cell reference regex must compile")
    })
}

/// Standalone row references left over after cell references are gone:
/// `@2`, `@<`, `@>>`. These read the source row at the current column.
pub(crate) fn row_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"@(?P<row>{SPEC_VAL})")).expect("row reference regex must compile")
    })
}

/// Whole-string cell position parser for targets and range endpoints:
/// `@2$3`, `$4`, `@3`, `${Price}`, or the empty string.
pub(crate) fn cell_pos_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"^(?:@(?P<row>{SPEC_VAL}))?(?:\$(?P<col>{SPEC_VAL}))?$"
        ))
        .expect("cell position regex must compile")
    })
}

/// Range references inside an expression: `@<..@>>`, `@2$1..@5$3`.
pub(crate) fn range_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let cell_spec = cell_spec_pat();
        Regex::new(&format!(r"(?P<start>{cell_spec})\.\.(?P<end>{cell_spec})"))
            .expect("range reference regex must compile")
    })
}
