//! Mutable lexer state threaded through a tokenization pass.

/// The state of a tokenization pass.
///
/// The state always describes the position immediately before the next
/// match attempt. Rule predicates observe it; match actions may flip the
/// flags they own (for example, entering or leaving a block comment).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LexerState<K> {
    /// The kind of the most recently emitted token.
    ///
    /// Suppressed tokens do not update this field.
    pub previous: Option<K>,
    /// The current line (1-indexed).
    pub line: usize,
    /// The current column (1-indexed, in characters).
    pub column: usize,
    /// Whether the winning candidate consumes the rest of the current
    /// physical line.
    ///
    /// Only set for match actions. Applicability predicates run before any
    /// candidate has won and always see `false`.
    pub full_match: bool,
    /// Whether a line break immediately follows the winning candidate.
    ///
    /// Only set for match actions, like [`LexerState::full_match`].
    pub line_break_follows: bool,
    /// Whether the lexer is inside a multi-line comment block.
    pub in_comment_block: bool,
    /// Whether the current position is the start of a physical line.
    pub start_of_line: bool,
}

impl<K> Default for LexerState<K> {
    fn default() -> Self {
        Self {
            previous: None,
            line: 1,
            column: 1,
            full_match: false,
            line_break_follows: false,
            in_comment_block: false,
            start_of_line: true,
        }
    }
}

impl<K: Copy + Eq> LexerState<K> {
    /// Returns `true` if the previously emitted token has one of the given kinds.
    pub fn previous_is(&self, kinds: &[K]) -> bool {
        self.previous.map(|p| kinds.contains(&p)).unwrap_or(false)
    }

    /// Advances line and column bookkeeping past the given raw text.
    pub(crate) fn advance(&mut self, consumed: &str) {
        let mut newline = false;
        let mut chars = consumed.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    // A "\r\n" pair counts as a single line break.
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    self.line += 1;
                    self.column = 1;
                    newline = true;
                }
                '\n' => {
                    self.line += 1;
                    self.column = 1;
                    newline = true;
                }
                _ => {
                    self.column += 1;
                    newline = false;
                }
            }
        }
        if !consumed.is_empty() {
            self.start_of_line = newline;
        }
    }
}
