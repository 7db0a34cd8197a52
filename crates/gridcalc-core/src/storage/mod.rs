//! Comment-preserving table codecs.
//!
//! Both codecs are line-oriented: a line starting with `#` is a comment,
//! recorded against its original line index and re-emitted there on output;
//! every other line is one table row. Fields never span lines.

mod csv;
mod tsv;

pub use csv::{read_csv, write_csv};
pub use tsv::{read_tsv, write_tsv};

use std::collections::BTreeMap;

/// A table of opaque cell text.
pub type Table = Vec<Vec<String>>;

/// Comment lines keyed by original 0-based line index.
pub type CommentLines = BTreeMap<usize, String>;

/// Interleave table rows and comment lines by original line index: the
/// output line at a comment's recorded index is that comment; rows fill the
/// remaining positions in order.
pub(crate) fn interleave<W, E>(
    table: &Table,
    comments: &CommentLines,
    mut write_row: W,
) -> Result<(), E>
where
    W: FnMut(LineContent<'_>) -> Result<(), E>,
{
    let mut row_idx = 0;
    let mut emitted_comments = 0;
    let mut line = 0;
    while row_idx < table.len() || emitted_comments < comments.len() {
        if let Some(comment) = comments.get(&line) {
            write_row(LineContent::Comment(comment))?;
            emitted_comments += 1;
        } else if row_idx < table.len() {
            write_row(LineContent::Row(&table[row_idx]))?;
            row_idx += 1;
        }
        line += 1;
    }
    Ok(())
}

/// One output line: a preserved comment or a table row.
pub(crate) enum LineContent<'a> {
    Comment(&'a str),
    Row(&'a [String]),
}
