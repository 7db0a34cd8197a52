//! Formula application driver.

use rhai::Dynamic;

use super::expand::expand_expression;
use super::format::format_dynamic;
use super::resolve::{parse_cell_position, HeaderMap, Resolved};
use super::spec::formula_re;
use crate::builtins::new_engine;
use crate::error::{EngineError, Result};

/// Options for [`apply`].
#[derive(Clone, Copy, Debug)]
pub struct ApplyOptions {
    /// Treat row 0 as a header: it is never a formula target and feeds the
    /// `${name}` column lookup. Default true.
    pub has_header: bool,
    /// Skip the `exit` sentinel instead of stopping at it. Default false.
    pub ignore_exit: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        ApplyOptions {
            has_header: true,
            ignore_exit: false,
        }
    }
}

/// Apply table formulas to `table` in place.
///
/// Formulas run in order; within one formula, target cells are visited in
/// row-major order and every evaluation sees all earlier writes. A formula
/// consisting of exactly `exit` stops processing (unless `ignore_exit`),
/// leaving prior writes intact. Errors abort with cells written so far kept.
pub fn apply(table: &mut [Vec<String>], formulas: &[String], options: ApplyOptions) -> Result<()> {
    if formulas.is_empty() {
        return Ok(());
    }

    let data_start_row = if options.has_header { 1 } else { 0 };

    let mut headers = HeaderMap::new();
    if options.has_header {
        if let Some(header_row) = table.first() {
            for (col_idx, name) in header_row.iter().enumerate() {
                headers.insert(name.clone(), col_idx);
            }
        }
    }

    let engine = new_engine();

    for formula in formulas {
        let formula = formula.trim();
        if formula.is_empty() {
            continue;
        }

        if formula == "exit" {
            if options.ignore_exit {
                continue;
            }
            return Ok(());
        }

        let Some(caps) = formula_re().captures(formula) else {
            return Err(EngineError::MalformedFormula(formula.to_string()));
        };
        let start_spec = caps.name("target").map_or("", |m| m.as_str());
        let end_spec = caps.name("end").map_or("", |m| m.as_str());
        let expression = caps.name("expr").map_or("", |m| m.as_str());

        if start_spec.is_empty() && end_spec.is_empty() {
            return Err(EngineError::MalformedFormula(formula.to_string()));
        }

        let max_row_len = table.iter().map(Vec::len).max().unwrap_or(0);

        // Targets are parsed without a current position; relative specs in
        // a target leave their axis unconstrained.
        let target = |spec: &str| -> Result<(Resolved, Resolved)> {
            parse_cell_position(spec, table.len(), max_row_len, None, &headers).map_err(|e| {
                EngineError::InvalidTarget {
                    spec: spec.to_string(),
                    source: Box::new(e),
                }
            })
        };
        let (row_start, col_start) = target(start_spec)?;
        let (row_end, col_end) = if end_spec.is_empty() {
            (row_start, col_start)
        } else {
            target(end_spec)?
        };

        for row_idx in data_start_row..table.len() {
            if outside(row_idx, row_start, row_end) {
                continue;
            }
            for col_idx in 0..table[row_idx].len() {
                if outside(col_idx, col_start, col_end) {
                    continue;
                }

                let expanded = expand_expression(
                    expression,
                    table,
                    row_idx,
                    col_idx,
                    data_start_row,
                    &headers,
                )?;
                let value: Dynamic =
                    engine
                        .eval(&expanded)
                        .map_err(|e| EngineError::Eval {
                            formula: formula.to_string(),
                            row: row_idx + 1,
                            col: col_idx + 1,
                            message: e.to_string(),
                        })?;

                table[row_idx][col_idx] = format_dynamic(&value);
            }
        }
    }

    Ok(())
}

/// Is `idx` outside the inclusive window `[start, end]`? An unspecified
/// bound does not constrain its side.
fn outside(idx: usize, start: Resolved, end: Resolved) -> bool {
    let idx = idx as i64;
    if let Resolved::At(first) = start {
        if idx < first {
            return true;
        }
    }
    if let Resolved::At(last) = end {
        if idx > last {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn run(rows: &[&[&str]], formulas: &[&str]) -> Vec<Vec<String>> {
        let mut t = table(rows);
        let formulas: Vec<String> = formulas.iter().map(|f| f.to_string()).collect();
        apply(&mut t, &formulas, ApplyOptions::default()).unwrap();
        t
    }

    #[test]
    fn test_empty_formula_list_is_identity() {
        let rows: &[&[&str]] = &[
            &["Item", "Price", "Qty", "Total"],
            &["Apple", "100", "5", ""],
        ];
        assert_eq!(run(rows, &[]), table(rows));
    }

    #[test]
    fn test_column_arithmetic() {
        let result = run(
            &[
                &["Item", "Price", "Qty", "Total"],
                &["Apple", "100", "5", ""],
                &["Orange", "150", "3", ""],
            ],
            &["$4 = $2 * $3"],
        );
        assert_eq!(result[1][3], "500");
        assert_eq!(result[2][3], "450");
        // Header row untouched.
        assert_eq!(result[0], vec!["Item", "Price", "Qty", "Total"]);
    }

    #[test]
    fn test_chained_formulas_see_earlier_writes() {
        let result = run(
            &[
                &["Item", "Price", "Qty", "Total", "Tax", "Grand Total"],
                &["Apple", "100", "5", "", "", ""],
                &["Orange", "150", "3", "", "", ""],
            ],
            &["$4=$2*$3", "$5=$4/10", "$6=$4+$5"],
        );
        assert_eq!(result[1][3..], ["500", "50", "550"]);
        assert_eq!(result[2][3..], ["450", "45", "495"]);
    }

    #[test]
    fn test_no_header_targets_first_row() {
        let mut t = table(&[&["Apple", "100", "5", ""], &["Orange", "150", "3", ""]]);
        apply(
            &mut t,
            &["$4=$2*$3".to_string()],
            ApplyOptions {
                has_header: false,
                ..ApplyOptions::default()
            },
        )
        .unwrap();
        assert_eq!(t[0][3], "500");
        assert_eq!(t[1][3], "450");
    }

    #[test]
    fn test_header_name_references() {
        let result = run(
            &[
                &["Item", "Price", "Qty", "Total"],
                &["Apple", "100", "5", ""],
                &["Orange", "150", "3", ""],
            ],
            &["${Total}=${Price}*${Qty}"],
        );
        assert_eq!(result[1][3], "500");
        assert_eq!(result[2][3], "450");
    }

    #[test]
    fn test_relative_column_references() {
        let result = run(
            &[
                &["a", "b", "result"],
                &["5", "3", ""],
                &["10", "2", ""],
            ],
            &["$3=$-2*$-1"],
        );
        assert_eq!(result[1][2], "15");
        assert_eq!(result[2][2], "20");
    }

    #[test]
    fn test_relative_column_with_arithmetic() {
        let result = run(
            &[&["a", "b"], &["10", ""], &["20", ""]],
            &["$2=$-1+5"],
        );
        assert_eq!(result[1][1], "15");
        assert_eq!(result[2][1], "25");
    }

    #[test]
    fn test_column_copy_edge_anchor() {
        let result = run(
            &[
                &["a", "b", "c", "d", "e"],
                &["1", "2", "3", "4", ""],
                &["5", "6", "7", "8", ""],
            ],
            &["$5=$4"],
        );
        assert_eq!(result[1][4], "4");
        assert_eq!(result[2][4], "8");

        let result = run(
            &[
                &["a", "b", "c", "d", "e"],
                &["1", "2", "3", "4", ""],
                &["6", "7", "8", "9", ""],
            ],
            &["$5=$<<"],
        );
        assert_eq!(result[1][4], "2");
        assert_eq!(result[2][4], "7");

        let result = run(
            &[
                &["a", "b", "c", "d", "e"],
                &["1", "2", "", "4", "5"],
                &["6", "7", "", "9", "10"],
            ],
            &["$3=$>>"],
        );
        assert_eq!(result[1][2], "4");
        assert_eq!(result[2][2], "9");
    }

    #[test]
    fn test_row_copy() {
        let result = run(
            &[
                &["a", "b", "c", "d", "e"],
                &["1", "2", "3", "4", "5"],
                &["", "", "", "", ""],
            ],
            &["@3=@<<"],
        );
        assert_eq!(result[2], vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_row_copy_relative() {
        let result = run(
            &[
                &["a", "b", "c", "d", "e"],
                &["1", "2", "3", "4", "5"],
                &["", "", "", "", ""],
            ],
            &["@3=@-1"],
        );
        assert_eq!(result[2], vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_row_copy_bottom_anchor() {
        let result = run(
            &[
                &["a", "b", "c", "d", "e"],
                &["1", "2", "3", "4", "5"],
                &["6", "7", "8", "9", "10"],
                &["", "", "", "", ""],
            ],
            &["@4=@>>"],
        );
        assert_eq!(result[3], vec!["6", "7", "8", "9", "10"]);
    }

    #[test]
    fn test_range_target_then_aggregate() {
        let result = run(
            &[
                &["Item", "Price", "Qty", "Total"],
                &["Apple", "100", "5", ""],
                &["Orange", "150", "3", ""],
                &["Total", "", "", ""],
            ],
            &["@2$>..@>>$>=$2*$3", "@>$>=vsum(@<$>..@>>$>)"],
        );
        assert_eq!(result[1][3], "500");
        assert_eq!(result[2][3], "450");
        assert_eq!(result[3][3], "950");
    }

    #[test]
    fn test_aggregate_with_implicit_column_range() {
        let result = run(
            &[
                &["Item", "Price", "Qty", "Total"],
                &["Apple", "100", "5", ""],
                &["Orange", "150", "3", ""],
                &["Total", "", "", ""],
            ],
            &["@2$>..@>>$>=$2*$3", "@>$>=vsum(@<..@>>)"],
        );
        assert_eq!(result[3][3], "950");
    }

    #[test]
    fn test_aggregate_relative_row_range() {
        let result = run(
            &[&["val"], &["10"], &["20"], &["30"], &[""]],
            &["@>$1=vsum(@<..@-1)"],
        );
        assert_eq!(result[4][0], "60");
    }

    #[test]
    fn test_invoice_with_compact_range_target() {
        let result = run(
            &[
                &["Item", "UnitPrice", "Quantity", "Total"],
                &["Apple", "2.5", "12", ""],
                &["Banana", "2.0", "5", ""],
                &["Orange", "1.2", "8", ""],
                &["Total", "", "", ""],
            ],
            &["@<$>..@>>=$2*$3", "@>$>=vsum(@<..@>>)"],
        );
        assert_eq!(result[1][3], "30");
        assert_eq!(result[2][3], "10");
        assert_eq!(result[3][3], "9.6");
        assert_eq!(result[4][3], "49.6");
    }

    #[test]
    fn test_statistics_summary_row() {
        let result = run(
            &[
                &["Value", "Sum", "Mean", "Median", "Min", "Max"],
                &["15", "", "", "", "", ""],
                &["42", "", "", "", "", ""],
                &["8", "", "", "", "", ""],
                &["33", "", "", "", "", ""],
                &["", "", "", "", "", ""],
            ],
            &[
                "@>$2=vsum(@<$1..@>>$1)",
                "@>$3=vmean(@<$1..@>>$1)",
                "@>$4=vmedian(@<$1..@>>$1)",
                "@>$5=vmin(@<$1..@>>$1)",
                "@>$6=vmax(@<$1..@>>$1)",
            ],
        );
        assert_eq!(result[5][1..], ["98", "24.5", "24", "8", "42"]);
    }

    #[test]
    fn test_vmean_fills_whole_column() {
        let result = run(
            &[
                &["Item", "Value", "Average"],
                &["A", "10", ""],
                &["B", "20", ""],
                &["C", "30", ""],
            ],
            &["@<$>..@>$>=vmean(@<$2..@>$2)"],
        );
        assert_eq!(result[1][2], "20");
        assert_eq!(result[2][2], "20");
        assert_eq!(result[3][2], "20");
    }

    #[test]
    fn test_exp_builtin() {
        let result = run(
            &[&["Value", "Result"], &["1", ""], &["2", ""]],
            &["@2$2=exp($1)", "@3$2=exp($1)"],
        );
        assert_eq!(result[1][1], "2.718281828459045");
        assert_eq!(result[2][1], "7.38905609893065");
    }

    #[test]
    fn test_string_concatenation() {
        let result = run(
            &[
                &["String 1", "String 2", "String 3", "Result"],
                &["Hello", "World", "123", ""],
            ],
            &["$4 = $1 + $2 + $3"],
        );
        assert_eq!(result[1][3], "HelloWorld123");
    }

    #[test]
    fn test_concatenation_with_quotes_and_braces_in_cells() {
        let result = run(
            &[
                &["String 1", "String 2", "Result"],
                &["Hello \"Hello\"", "{1, 2, 3, 4}", ""],
            ],
            &["$3 = $1 + $2"],
        );
        assert_eq!(result[1][2], "Hello \"Hello\"{1, 2, 3, 4}");
    }

    #[test]
    fn test_math_constant() {
        let result = run(&[&["a", "pi"], &["x", ""]], &["$2 = PI()"]);
        assert_eq!(result[1][1], "3.141592653589793");
    }

    #[test]
    fn test_exit_stops_processing() {
        let mut t = table(&[&["a", "b", "c"], &["X", "", ""]]);
        let formulas: Vec<String> = ["$2=$1", "exit", "$3=$1"]
            .iter()
            .map(|f| f.to_string())
            .collect();
        apply(&mut t, &formulas, ApplyOptions::default()).unwrap();
        assert_eq!(t[1], vec!["X", "X", ""]);
    }

    #[test]
    fn test_ignore_exit_continues() {
        let mut t = table(&[&["a", "b", "c"], &["X", "", ""]]);
        let formulas: Vec<String> = ["$2=$1", "exit", "$3=$1"]
            .iter()
            .map(|f| f.to_string())
            .collect();
        apply(
            &mut t,
            &formulas,
            ApplyOptions {
                ignore_exit: true,
                ..ApplyOptions::default()
            },
        )
        .unwrap();
        assert_eq!(t[1], vec!["X", "X", "X"]);
    }

    #[test]
    fn test_malformed_formula_errors() {
        let mut t = table(&[&["a"], &["1"]]);
        let err = apply(&mut t, &["nonsense".to_string()], ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFormula(_)));

        let err = apply(&mut t, &["=1+1".to_string()], ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedFormula(_)));
    }

    #[test]
    fn test_unknown_header_errors() {
        let mut t = table(&[&["a", "b"], &["1", ""]]);
        let err = apply(
            &mut t,
            &["$2=${Missing}".to_string()],
            ApplyOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::UnknownHeader(_)));
    }

    #[test]
    fn test_runtime_error_reports_cell() {
        let mut t = table(&[&["a", "b"], &["1", ""]]);
        let err = apply(
            &mut t,
            &["$2=no_such_fn($1)".to_string()],
            ApplyOptions::default(),
        )
        .unwrap_err();
        match err {
            EngineError::Eval { row, col, .. } => {
                assert_eq!(row, 2);
                assert_eq!(col, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_header_target_is_a_noop() {
        // A target resolving into the header row writes nothing.
        let result = run(&[&["a", "b"], &["1", "2"]], &["@1$2=99"]);
        assert_eq!(result[0], vec!["a", "b"]);
        assert_eq!(result[1], vec!["1", "2"]);
    }

    #[test]
    fn test_earlier_writes_visible_within_one_formula() {
        // Each row doubles the freshly written value above it.
        let result = run(
            &[&["n"], &["1"], &[""], &[""]],
            &["@3$1..@>$1=@-1$1*2"],
        );
        assert_eq!(result[2][0], "2");
        assert_eq!(result[3][0], "4");
    }

    #[test]
    fn test_bad_target_reports_the_spec() {
        let mut t = table(&[&["a", "b"], &["1", ""]]);
        let err = apply(
            &mut t,
            &["${Nope}=1".to_string()],
            ApplyOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTarget { ref spec, .. } if spec == "${Nope}"));
    }

    #[test]
    fn test_repeated_apply_is_deterministic() {
        let rows: &[&[&str]] = &[
            &["Item", "Price", "Qty", "Total"],
            &["Apple", "100", "5", ""],
            &["Orange", "150", "3", ""],
        ];
        let first = run(rows, &["$4=$2*$3"]);
        let second = run(rows, &["$4=$2*$3"]);
        assert_eq!(first, second);
    }
}
