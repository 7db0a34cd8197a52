//! Reference and range expansion.
//!
//! Before an expression reaches Rhai, every table reference in it is
//! replaced with a literal:
//!
//! - ranges (`@2$1..@5$3`) become `[...]` array literals;
//! - cell references (`@2$3`, `$2`, `${Price}`) become a number or string
//!   literal, or `0` when out of range;
//! - standalone row references (`@<<`, `@-1`) become the source row's value
//!   at the current column.
//!
//! The passes run in that order; ranges must go first so their `..` is not
//! torn apart into two adjacent references. Text inside double-quoted
//! string literals is never rewritten, including literals produced by an
//! earlier pass.

use regex::{Captures, Regex};

use super::resolve::{parse_cell_position, resolve_col_spec, resolve_row_spec, HeaderMap, Resolved};
use super::spec::{cell_ref_re, range_ref_re, row_ref_re};
use crate::error::{EngineError, Result};

/// Expand all references in `expr` for the cell at `(current_row,
/// current_col)` (0-based), yielding a pure Rhai expression.
pub(crate) fn expand_expression(
    expr: &str,
    table: &[Vec<String>],
    current_row: usize,
    current_col: usize,
    data_start_row: usize,
    headers: &HeaderMap,
) -> Result<String> {
    let current = (current_row, current_col);

    // Pass 1: ranges become array literals.
    let expr = replace_refs(expr, range_ref_re(), |caps| {
        let start_pos = caps.name("start").map_or("", |m| m.as_str());
        let end_pos = caps.name("end").map_or("", |m| m.as_str());
        if start_pos.is_empty() || end_pos.is_empty() {
            // Not a table range (e.g. Rhai's own `0..5`); leave it alone.
            return Ok(None);
        }
        let parts = expand_range(start_pos, end_pos, table, current, data_start_row, headers)?;
        Ok(Some(format!("[{}]", parts.join(","))))
    })?;

    // Pass 2: cell references (column mandatory, row optional).
    let expr = replace_refs(&expr, cell_ref_re(), |caps| {
        let row_spec = caps.name("row").map_or("", |m| m.as_str());
        let col_spec = caps.name("col").map_or("", |m| m.as_str());

        let source_row = if row_spec.is_empty() {
            current_row as i64
        } else {
            resolve_row_spec(row_spec, table.len(), Some(current_row))
                .index()
                .unwrap_or(-1)
        };

        let row_len = usize::try_from(source_row)
            .ok()
            .and_then(|r| table.get(r))
            .map_or(0, |row| row.len());
        let source_col = resolve_col_spec(col_spec, row_len, Some(current_col), headers)?
            .index()
            .unwrap_or(-1);

        Ok(Some(cell_literal(table, source_row, source_col)))
    })?;

    // Pass 3: leftover row references read the current column.
    replace_refs(&expr, row_ref_re(), |caps| {
        let row_spec = caps.name("row").map_or("", |m| m.as_str());
        let source_row = resolve_row_spec(row_spec, table.len(), Some(current_row))
            .index()
            .unwrap_or(-1);
        Ok(Some(cell_literal(table, source_row, current_col as i64)))
    })
}

/// Expand a `start..end` range into literal list elements. Empty cells are
/// omitted; numeric cells become float literals, everything else a quoted
/// string.
fn expand_range(
    start_pos: &str,
    end_pos: &str,
    table: &[Vec<String>],
    current: (usize, usize),
    data_start_row: usize,
    headers: &HeaderMap,
) -> Result<Vec<String>> {
    let max_row_len = table.iter().map(Vec::len).max().unwrap_or(0);

    let endpoint = |pos: &str| -> Result<(Resolved, Resolved)> {
        parse_cell_position(pos, table.len(), max_row_len, Some(current), headers).map_err(|e| {
            EngineError::InvalidRangeEndpoint {
                spec: pos.to_string(),
                source: Box::new(e),
            }
        })
    };
    let (start_row, start_col) = endpoint(start_pos)?;
    let (end_row, end_col) = endpoint(end_pos)?;

    // Column-less endpoints read the current column.
    let (col_first, col_last) = match (start_col.index(), end_col.index()) {
        (None, None) => (current.1 as i64, current.1 as i64),
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Vec::new()),
    };

    // Row-less endpoints: a horizontal slice of the current row when the
    // columns differ, the whole data extent of the column otherwise.
    let (row_first, row_last) = match (start_row.index(), end_row.index()) {
        (None, None) => {
            if col_first != col_last {
                (current.0 as i64, current.0 as i64)
            } else {
                (data_start_row as i64, table.len() as i64 - 1)
            }
        }
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Vec::new()),
    };

    let mut values = Vec::new();
    let mut r = row_first;
    while r >= 0 && r <= row_last && (r as usize) < table.len() {
        let row = &table[r as usize];
        let mut c = col_first;
        while c >= 0 && c <= col_last && (c as usize) < row.len() {
            let cell = &row[c as usize];
            match parse_finite(cell) {
                Some(n) => values.push(number_literal(n)),
                None => {
                    if !cell.is_empty() {
                        values.push(quote_text(cell));
                    }
                }
            }
            c += 1;
        }
        r += 1;
    }
    Ok(values)
}

/// Literal for the cell at `(row, col)`: a float for numeric text, a quoted
/// string otherwise, `0` when the position is outside the table.
fn cell_literal(table: &[Vec<String>], row: i64, col: i64) -> String {
    let cell = usize::try_from(row)
        .ok()
        .zip(usize::try_from(col).ok())
        .and_then(|(r, c)| table.get(r).and_then(|row| row.get(c)));
    match cell {
        Some(text) => match parse_finite(text) {
            Some(n) => number_literal(n),
            None => quote_text(text),
        },
        None => "0".to_string(),
    }
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Rhai float literal. Integral values keep a `.0` suffix so arithmetic on
/// substituted cells stays in floating point.
fn number_literal(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{n:.1}")
    } else {
        n.to_string()
    }
}

/// Rhai string literal with `"` and `\` (and control whitespace) escaped.
fn quote_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Apply `re` to the parts of `input` that lie outside double-quoted string
/// literals, replacing each match with what `replacer` returns (or leaving
/// the match untouched on `None`). The first error aborts the pass.
fn replace_refs<F>(input: &str, re: &Regex, mut replacer: F) -> Result<String>
where
    F: FnMut(&Captures) -> Result<Option<String>>,
{
    let mut err: Option<EngineError> = None;
    let mut replace_segment = |seg: &str| -> String {
        re.replace_all(seg, |caps: &Captures| {
            if err.is_some() {
                return caps[0].to_string();
            }
            match replacer(caps) {
                Ok(Some(replacement)) => replacement,
                Ok(None) => caps[0].to_string(),
                Err(e) => {
                    err = Some(e);
                    caps[0].to_string()
                }
            }
        })
        .to_string()
    };

    let bytes = input.as_bytes();
    let mut out = String::new();
    let mut seg_start = 0;
    let mut in_string = false;
    let mut backslashes = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            if b == b'\\' {
                backslashes += 1;
                i += 1;
                continue;
            }
            if b == b'"' && backslashes % 2 == 0 {
                out.push_str(&input[seg_start..=i]);
                in_string = false;
                seg_start = i + 1;
            }
            backslashes = 0;
            i += 1;
            continue;
        }

        if b == b'"' {
            out.push_str(&replace_segment(&input[seg_start..i]));
            in_string = true;
            seg_start = i;
            backslashes = 0;
            i += 1;
            continue;
        }

        i += 1;
    }

    if seg_start < input.len() {
        if in_string {
            out.push_str(&input[seg_start..]);
        } else {
            out.push_str(&replace_segment(&input[seg_start..]));
        }
    }

    match err {
        Some(e) => Err(e),
        None => Ok(out),
    }
}
