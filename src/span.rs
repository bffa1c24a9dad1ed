//! Source spans, used to point syntax errors back into the raw input.

use miette::SourceSpan;

/// A byte range in the raw input handed to a [`Format`](crate::Format).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// Byte offset from start of source.
    pub offset: usize,
    /// Length in bytes.
    pub len: usize,
}

impl Span {
    /// A span of `len` bytes starting at `offset`.
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Span of the byte at a 1-based `line` and `column`, as reported by
    /// line-oriented parsers. Clamped to the end of `source`.
    pub fn at_line_column(source: &[u8], line: usize, column: usize) -> Self {
        let line_start = source
            .split_inclusive(|byte| *byte == b'\n')
            .take(line.saturating_sub(1))
            .map(<[u8]>::len)
            .sum::<usize>();
        let offset = (line_start + column.saturating_sub(1)).min(source.len());
        let len = usize::from(offset < source.len());
        Self { offset, len }
    }
}

impl From<Span> for SourceSpan {
    fn from(span: Span) -> Self {
        SourceSpan::new(span.offset.into(), span.len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_and_column_map_to_offsets() {
        let source = b"{\n  \"a\": 1,\n  \"b\": ]\n}";
        let span = Span::at_line_column(source, 3, 8);
        assert_eq!(source[span.offset], b']');
        assert_eq!(span.len, 1);
        assert_eq!(Span::at_line_column(source, 1, 1), Span::new(0, 1));
    }

    #[test]
    fn past_the_end_is_clamped() {
        let source = b"{";
        let span = Span::at_line_column(source, 1, 2);
        assert_eq!(span, Span::new(1, 0));
    }
}
