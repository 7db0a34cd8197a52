//! Row/column spec resolution.
//!
//! Specs resolve against the table shape and (for relatives) the current
//! cell. Resolution is 0-based; the surface syntax is 1-based. An absent
//! spec resolves to [`Resolved::Unspecified`]; anchors and relatives may
//! resolve to an index outside the table, which callers bounds-check.

use std::collections::HashMap;

use super::spec::cell_pos_re;
use crate::error::{EngineError, Result};

/// Header name to 0-based column index. Last duplicate wins.
pub type HeaderMap = HashMap<String, usize>;

/// One axis of a resolved cell position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolved {
    /// The spec was absent; the axis is unconstrained.
    Unspecified,
    /// A concrete 0-based index. May lie outside the table when the spec
    /// was an edge anchor on a small table or a relative offset.
    At(i64),
}

impl Resolved {
    pub(crate) fn index(self) -> Option<i64> {
        match self {
            Resolved::Unspecified => None,
            Resolved::At(i) => Some(i),
        }
    }
}

/// Resolve a row spec value (without the leading `@`).
///
/// `current_row` is the 0-based row of the cell being written, when there
/// is one; relative specs without a current position resolve to
/// `Unspecified`.
pub(crate) fn resolve_row_spec(spec: &str, table_len: usize, current_row: Option<usize>) -> Resolved {
    match spec {
        "" => Resolved::Unspecified,
        "<" => Resolved::At(0),
        "<<" => Resolved::At(1),
        "<<<" => Resolved::At(2),
        ">" => Resolved::At(table_len as i64 - 1),
        ">>" => Resolved::At(table_len as i64 - 2),
        ">>>" => Resolved::At(table_len as i64 - 3),
        _ => {
            let n: i64 = match spec.parse() {
                Ok(n) => n,
                Err(_) => return Resolved::Unspecified,
            };
            if n > 0 {
                Resolved::At(n - 1)
            } else if n < 0 {
                match current_row {
                    Some(row) => Resolved::At(row as i64 + n),
                    None => Resolved::Unspecified,
                }
            } else {
                Resolved::Unspecified
            }
        }
    }
}

/// Resolve a column spec value (without the leading `$`).
///
/// `row_len` is the width of the row being read (or the table's maximum
/// width for targets). Errors: unknown header name, absolute index beyond
/// the row, relative index resolving negative.
pub(crate) fn resolve_col_spec(
    spec: &str,
    row_len: usize,
    current_col: Option<usize>,
    headers: &HeaderMap,
) -> Result<Resolved> {
    match spec {
        "" => Ok(Resolved::Unspecified),
        "<" => Ok(Resolved::At(0)),
        "<<" => Ok(Resolved::At(1)),
        "<<<" => Ok(Resolved::At(2)),
        ">" => Ok(Resolved::At(row_len as i64 - 1)),
        ">>" => Ok(Resolved::At(row_len as i64 - 2)),
        ">>>" => Ok(Resolved::At(row_len as i64 - 3)),
        _ => {
            if let Some(name) = spec.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                return match headers.get(name) {
                    Some(&idx) => Ok(Resolved::At(idx as i64)),
                    None => Err(EngineError::UnknownHeader(name.to_string())),
                };
            }

            let n: i64 = match spec.parse() {
                Ok(n) => n,
                Err(_) => return Ok(Resolved::Unspecified),
            };
            if n > 0 {
                let idx = n - 1;
                if row_len > 0 && idx >= row_len as i64 {
                    return Err(EngineError::ColumnOutOfRange {
                        index: n,
                        width: row_len,
                    });
                }
                Ok(Resolved::At(idx))
            } else if n < 0 {
                match current_col {
                    Some(col) => {
                        let idx = col as i64 + n;
                        if idx < 0 {
                            return Err(EngineError::NegativeColumn(n));
                        }
                        Ok(Resolved::At(idx))
                    }
                    None => Ok(Resolved::Unspecified),
                }
            } else {
                Ok(Resolved::Unspecified)
            }
        }
    }
}

/// Parse a whole cell position spec like `@2$3`, `$4`, `@3`, `${Price}`.
///
/// Returns the resolved row and column. A spec that does not match the
/// position grammar at all resolves both axes to `Unspecified`.
pub(crate) fn parse_cell_position(
    pos: &str,
    table_len: usize,
    row_len: usize,
    current: Option<(usize, usize)>,
    headers: &HeaderMap,
) -> Result<(Resolved, Resolved)> {
    if pos.is_empty() {
        return Ok((Resolved::Unspecified, Resolved::Unspecified));
    }

    let Some(caps) = cell_pos_re().captures(pos) else {
        return Ok((Resolved::Unspecified, Resolved::Unspecified));
    };

    let row_spec = caps.name("row").map_or("", |m| m.as_str());
    let col_spec = caps.name("col").map_or("", |m| m.as_str());

    let row = resolve_row_spec(row_spec, table_len, current.map(|(r, _)| r));
    let col = resolve_col_spec(col_spec, row_len, current.map(|(_, c)| c), headers)?;
    Ok((row, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert("Item".to_string(), 0);
        map.insert("Price".to_string(), 1);
        map.insert("Qty".to_string(), 2);
        map.insert("Total".to_string(), 3);
        map
    }

    #[test]
    fn test_row_spec_absolute_and_anchors() {
        assert_eq!(resolve_row_spec("3", 5, None), Resolved::At(2));
        assert_eq!(resolve_row_spec("<", 5, None), Resolved::At(0));
        assert_eq!(resolve_row_spec("<<<", 5, None), Resolved::At(2));
        assert_eq!(resolve_row_spec(">", 5, None), Resolved::At(4));
        assert_eq!(resolve_row_spec(">>>", 5, None), Resolved::At(2));
        assert_eq!(resolve_row_spec("", 5, None), Resolved::Unspecified);
    }

    #[test]
    fn test_row_spec_relative() {
        assert_eq!(resolve_row_spec("-1", 5, Some(3)), Resolved::At(2));
        assert_eq!(resolve_row_spec("-2", 5, Some(3)), Resolved::At(1));
        // No current position: relatives are unconstrained.
        assert_eq!(resolve_row_spec("-1", 5, None), Resolved::Unspecified);
        // Zero never names a row.
        assert_eq!(resolve_row_spec("0", 5, Some(3)), Resolved::Unspecified);
    }

    #[test]
    fn test_row_spec_deep_anchor_on_small_table() {
        assert_eq!(resolve_row_spec(">>>", 2, None), Resolved::At(-1));
    }

    #[test]
    fn test_col_spec_absolute() {
        assert_eq!(
            resolve_col_spec("2", 4, None, &headers()).unwrap(),
            Resolved::At(1)
        );
        assert!(matches!(
            resolve_col_spec("9", 4, None, &headers()),
            Err(EngineError::ColumnOutOfRange { index: 9, width: 4 })
        ));
    }

    #[test]
    fn test_col_spec_relative() {
        assert_eq!(
            resolve_col_spec("-1", 4, Some(3), &headers()).unwrap(),
            Resolved::At(2)
        );
        assert!(matches!(
            resolve_col_spec("-5", 4, Some(3), &headers()),
            Err(EngineError::NegativeColumn(-5))
        ));
        assert_eq!(
            resolve_col_spec("-1", 4, None, &headers()).unwrap(),
            Resolved::Unspecified
        );
    }

    #[test]
    fn test_col_spec_header_name() {
        assert_eq!(
            resolve_col_spec("{Total}", 4, None, &headers()).unwrap(),
            Resolved::At(3)
        );
        assert!(matches!(
            resolve_col_spec("{Missing}", 4, None, &headers()),
            Err(EngineError::UnknownHeader(ref name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_parse_cell_position() {
        let headers = headers();
        let (row, col) = parse_cell_position("@2$3", 4, 4, None, &headers).unwrap();
        assert_eq!(row, Resolved::At(1));
        assert_eq!(col, Resolved::At(2));

        let (row, col) = parse_cell_position("$4", 4, 4, None, &headers).unwrap();
        assert_eq!(row, Resolved::Unspecified);
        assert_eq!(col, Resolved::At(3));

        let (row, col) = parse_cell_position("", 4, 4, None, &headers).unwrap();
        assert_eq!(row, Resolved::Unspecified);
        assert_eq!(col, Resolved::Unspecified);
    }
}
