//! Physical and logical lines.
//!
//! A logical line is a physical line together with every continuation line
//! spliced onto it. Two continuation styles are supported: a marker at the
//! start of the *following* line (SPICE's `+`), and a marker at the end of
//! the *current* line (`\`).

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// The candidate window offered to the rules at each position.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// The current physical line, including its terminator.
    Line,
    /// The current line merged with its continuation lines.
    #[default]
    Logical,
    /// All remaining text.
    Full,
}

/// Line continuation markers.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Continuation {
    /// A marker that, as the first non-blank character of a line,
    /// continues the previous line.
    pub next_line: Option<char>,
    /// A marker that, as the last non-blank character of a line,
    /// continues onto the next line.
    pub current_line: Option<char>,
}

/// Returns the end of the line content and the end of the line terminator
/// for the physical line starting at `from`.
pub fn physical_line_end(text: &str, from: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => return (i, i + 1),
            b'\r' => {
                if bytes.get(i + 1) == Some(&b'\n') {
                    return (i, i + 2);
                }
                return (i, i + 1);
            }
            _ => i += 1,
        }
    }
    (bytes.len(), bytes.len())
}

#[inline]
fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

impl Continuation {
    /// SPICE-style continuations: `+` on the following line, `\` at the end
    /// of the current line.
    pub const fn spice() -> Self {
        Self {
            next_line: Some('+'),
            current_line: Some('\\'),
        }
    }

    /// Returns `true` if the line content ends with the current-line marker.
    pub fn continues_current(&self, content: &str) -> bool {
        self.current_line
            .map(|m| content.trim_end_matches(is_blank).ends_with(m))
            .unwrap_or(false)
    }

    /// Returns `true` if the line content starts with the next-line marker.
    pub fn continues_previous(&self, content: &str) -> bool {
        self.next_line
            .map(|m| content.trim_start_matches(is_blank).starts_with(m))
            .unwrap_or(false)
    }

    /// Returns the end offset (after the final terminator) of the logical
    /// line starting at `from`.
    pub fn logical_end(&self, text: &str, from: usize) -> usize {
        let mut pos = from;
        loop {
            let (content_end, end) = physical_line_end(text, pos);
            if end >= text.len() {
                return end;
            }
            let (next_content_end, _) = physical_line_end(text, end);
            if self.continues_current(&text[pos..content_end])
                || self.continues_previous(&text[end..next_content_end])
            {
                pos = end;
            } else {
                return end;
            }
        }
    }

    /// Splices the physical lines of `raw` into a single line.
    ///
    /// Markers are stripped and each line break becomes a single space.
    pub fn splice(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut pos = 0;
        let mut first = true;
        while pos < raw.len() {
            let (content_end, end) = physical_line_end(raw, pos);
            let mut content = &raw[pos..content_end];
            if !first {
                out.push(' ');
                if let Some(m) = self.next_line {
                    let trimmed = content.trim_start_matches(is_blank);
                    if let Some(rest) = trimmed.strip_prefix(m) {
                        content = rest;
                    }
                }
            }
            if end < raw.len() {
                if let Some(m) = self.current_line {
                    let trimmed = content.trim_end_matches(is_blank);
                    if let Some(rest) = trimmed.strip_suffix(m) {
                        content = rest;
                    }
                }
            }
            out.push_str(content);
            first = false;
            pos = end;
        }
        out
    }
}

/// A logical line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogicalLine {
    /// The spliced text, without line terminators.
    pub text: String,
    /// The physical line on which the logical line starts (1-indexed).
    pub line: usize,
    /// The number of physical lines spliced together.
    pub physical_lines: usize,
    /// The byte range of the logical line (terminators included) in the source.
    pub span: Range<usize>,
}

/// Reads logical lines from a string.
///
/// [`LogicalLines::peek`] never moves the read cursor, so it may be called
/// any number of times before advancing.
#[derive(Clone, Debug)]
pub struct LogicalLines<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
    continuation: Continuation,
}

impl<'a> LogicalLines<'a> {
    /// Creates a reader over `text`.
    pub fn new(text: &'a str, continuation: Continuation) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
            continuation,
        }
    }

    /// Returns the next logical line without consuming it.
    pub fn peek(&self) -> Option<LogicalLine> {
        if self.pos >= self.text.len() {
            return None;
        }
        let end = self.continuation.logical_end(self.text, self.pos);
        let raw = &self.text[self.pos..end];
        let mut physical_lines = 0;
        let mut p = 0;
        while p < raw.len() {
            physical_lines += 1;
            p = physical_line_end(raw, p).1;
        }
        Some(LogicalLine {
            text: self.continuation.splice(raw),
            line: self.line,
            physical_lines,
            span: self.pos..end,
        })
    }

    /// The byte offset of the read cursor.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.peek()?;
        self.pos = line.span.end;
        self.line += line.physical_lines;
        Some(line)
    }
}
