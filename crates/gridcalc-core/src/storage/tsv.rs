//! TSV codec with comment preservation. Fields are split on tabs verbatim;
//! there is no quoting.

use std::io::Write;

use super::{interleave, CommentLines, LineContent, Table};
use crate::error::Result;

/// Parse TSV content into rows plus the comment lines it skipped. A blank
/// line is a row with one empty cell.
pub fn read_tsv(content: &str) -> (Table, CommentLines) {
    let mut table = Table::new();
    let mut comments = CommentLines::new();

    for (line_num, line) in content.lines().enumerate() {
        if line.starts_with('#') {
            comments.insert(line_num, line.to_string());
        } else {
            table.push(line.split('\t').map(str::to_string).collect());
        }
    }

    (table, comments)
}

/// Write rows as TSV with comments restored to their original lines.
pub fn write_tsv(writer: &mut dyn Write, table: &Table, comments: &CommentLines) -> Result<()> {
    interleave(table, comments, |content| -> Result<()> {
        match content {
            LineContent::Comment(comment) => writeln!(writer, "{comment}")?,
            LineContent::Row(row) => writeln!(writer, "{}", row.join("\t"))?,
        }
        Ok(())
    })
}
