//! Source locations

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::fmt::Display;
use std::sync::Arc;

// Having a cap on MML text length ensures all columns and line numbers fit inside a u32.
pub const MAX_MML_TEXT_LENGTH: usize = 16 * 1024 * 1024;

/// A position inside a named source.
///
/// Both `line_number` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub(crate) file: Arc<str>,
    pub(crate) line_number: u32,
    pub(crate) column: u32,
}

impl Location {
    pub fn new(file: Arc<str>, line_number: u32, column: u32) -> Self {
        Self {
            file,
            line_number,
            column,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line_number(&self) -> u32 {
        self.line_number
    }

    pub fn column(&self) -> u32 {
        self.column
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}, {})", self.file, self.line_number, self.column)
    }
}

/// A physical line of a source file.
pub(crate) struct Line<'a> {
    pub text: &'a str,
    pub line_number: u32,
}

pub(crate) struct LineSplitter<'a> {
    remaining: &'a str,
    line_no: u32,
}

pub(crate) fn split_lines(s: &str) -> LineSplitter<'_> {
    LineSplitter {
        remaining: s,
        line_no: 0,
    }
}

impl<'a> Iterator for LineSplitter<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let (line, remaining) = match self.remaining.split_once('\n') {
            Some((line, remaining)) => (line, remaining),
            None => (self.remaining, ""),
        };
        self.line_no += 1;
        self.remaining = remaining;

        Some(Line {
            text: line.strip_suffix('\r').unwrap_or(line),
            line_number: self.line_no,
        })
    }
}

#[derive(Debug, Clone)]
struct Segment {
    offset: usize,
    location: Location,
}

/// One or more physical lines joined into a single logical line.
///
/// Each joined physical line keeps its own location so diagnostics still point at the
/// original source text.
#[derive(Debug, Clone)]
pub struct LineGroup {
    text: String,
    segments: Vec<Segment>,
}

impl LineGroup {
    pub(crate) fn new(text: String, location: Location) -> Self {
        Self {
            text,
            segments: vec![Segment {
                offset: 0,
                location,
            }],
        }
    }

    pub(crate) fn push_line(&mut self, text: &str, location: Location) {
        self.text.push('\n');
        self.segments.push(Segment {
            offset: self.text.len(),
            location,
        });
        self.text.push_str(text);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> Location {
        match self.segments.first() {
            Some(s) => s.location.clone(),
            None => unknown_location(),
        }
    }

    pub(crate) fn location_cursor(&self) -> LocationCursor<'_> {
        LocationCursor {
            group: self,
            segment: 0,
            offset: 0,
            column: self.segments.first().map_or(1, |s| s.location.column),
        }
    }
}

/// Converts byte offsets into locations.
///
/// Offsets must be queried in ascending order.
pub(crate) struct LocationCursor<'a> {
    group: &'a LineGroup,
    segment: usize,
    offset: usize,
    column: u32,
}

impl LocationCursor<'_> {
    pub fn location_at(&mut self, offset: usize) -> Location {
        let segments = &self.group.segments;

        while let Some(next) = segments.get(self.segment + 1) {
            if next.offset > offset {
                break;
            }
            self.segment += 1;
            self.offset = next.offset;
            self.column = next.location.column;
        }

        if offset > self.offset {
            if let Some(s) = self.group.text.get(self.offset..offset) {
                let n_chars: u32 = s.chars().count().try_into().unwrap_or(u32::MAX);
                self.column = self.column.saturating_add(n_chars);
            }
            self.offset = offset;
        }

        match segments.get(self.segment) {
            Some(s) => Location {
                column: self.column,
                ..s.location.clone()
            },
            None => unknown_location(),
        }
    }
}

pub(crate) fn unknown_location() -> Location {
    Location {
        file: Arc::from(""),
        line_number: 0,
        column: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line_number: u32, column: u32) -> Location {
        Location::new(Arc::from("test.mml"), line_number, column)
    }

    #[test]
    fn split_lines_handles_crlf() {
        let lines: Vec<_> = split_lines("a\r\nbb\n\nc")
            .map(|l| (l.line_number, l.text))
            .collect();

        assert_eq!(lines, vec![(1, "a"), (2, "bb"), (3, ""), (4, "c")]);
    }

    #[test]
    fn location_cursor_crosses_joined_lines() {
        let mut group = LineGroup::new("1 cde".to_owned(), loc(3, 1));
        group.push_line("  fg", loc(4, 1));

        let mut cursor = group.location_cursor();
        assert_eq!(cursor.location_at(0), loc(3, 1));
        assert_eq!(cursor.location_at(2), loc(3, 3));
        assert_eq!(cursor.location_at(4), loc(3, 5));
        // "fg" starts after the newline and two spaces
        assert_eq!(cursor.location_at(8), loc(4, 3));
    }
}
