//! Byte offset to line/column translation.

use std::{collections::HashMap, fmt};

use serde::Serialize;

use super::Span;

/// A 1-based line and character column.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LineCol {
    pub line: usize,
    pub column: usize,
}

/// The human readable position of a span.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub begin: LineCol,
    pub end: LineCol,
}

impl Location {
    pub fn of(source: &str, span: Span) -> Self {
        let positions = translate_positions(source, &[span.start, span.end]);
        let at = |offset: usize| {
            positions
                .get(&offset)
                .copied()
                .unwrap_or(LineCol { line: 1, column: 1 })
        };
        Location {
            begin: at(span.start),
            end: at(span.end),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {} symbol {} - line {} symbol {}",
            self.begin.line, self.begin.column, self.end.line, self.end.column
        )
    }
}

/// Maps every offset in `offsets` to its line and column in a single pass over `source`.
///
/// Lines are one plus the number of newlines before the offset; columns count characters
/// since the last newline, starting at 1. Offsets at or past the end of `source` map to the
/// position just after the last character.
pub fn translate_positions(source: &str, offsets: &[usize]) -> HashMap<usize, LineCol> {
    let mut pending: Vec<usize> = offsets.to_vec();
    pending.sort_unstable();
    pending.dedup();

    let mut result = HashMap::with_capacity(pending.len());
    let mut pending = pending.into_iter().peekable();
    let (mut line, mut column) = (1, 1);

    for (idx, c) in source.char_indices() {
        let next = idx + c.len_utf8();
        // Offsets inside a multi-byte character resolve to that character.
        while let Some(offset) = pending.next_if(|offset| *offset < next) {
            result.insert(offset, LineCol { line, column });
        }
        if pending.peek().is_none() {
            return result;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    for offset in pending {
        result.insert(offset, LineCol { line, column });
    }
    result
}
