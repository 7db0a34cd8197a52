//! CSV codec with comment preservation.

use std::io::Write;

use super::{interleave, CommentLines, LineContent, Table};
use crate::error::{GridcalcError, Result};

/// Parse CSV content into rows plus the comment lines it skipped.
///
/// Blank lines produce no row. Unquoted fields keep their whitespace so a
/// formula-free document round-trips byte for byte.
pub fn read_csv(content: &str) -> Result<(Table, CommentLines)> {
    let mut table = Table::new();
    let mut comments = CommentLines::new();

    for (line_num, line) in content.lines().enumerate() {
        if line.starts_with('#') {
            comments.insert(line_num, line.to_string());
        } else if !line.is_empty() {
            table.push(parse_csv_line(line, line_num)?);
        }
    }

    Ok((table, comments))
}

/// Parse a single CSV line, handling quoted fields and `""` escapes.
pub(crate) fn parse_csv_line(line: &str, line_num: usize) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => {
                    fields.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }
    }
    if in_quotes {
        return Err(GridcalcError::Codec {
            line: line_num + 1,
            message: "unterminated quoted field".to_string(),
        });
    }
    fields.push(current);
    Ok(fields)
}

/// Write rows as CSV with comments restored to their original lines.
pub fn write_csv(writer: &mut dyn Write, table: &Table, comments: &CommentLines) -> Result<()> {
    interleave(table, comments, |content| -> Result<()> {
        match content {
            LineContent::Comment(comment) => writeln!(writer, "{comment}")?,
            LineContent::Row(row) => {
                let fields: Vec<String> = row.iter().map(|f| escape_csv_field(f)).collect();
                writeln!(writer, "{}", fields.join(","))?;
            }
        }
        Ok(())
    })
}

/// Quote a field when it contains the delimiter, a quote, or a line break.
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
