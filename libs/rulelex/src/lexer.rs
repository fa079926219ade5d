//! The longest-match tokenizer.

use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::grammar::Grammar;
use crate::lines::{physical_line_end, Continuation, Window};
use crate::rule::{Emit, Rule};
use crate::state::LexerState;
use crate::token::{Kind, Token};

/// The maximum number of characters of unmatched input quoted in errors.
const ERROR_SNIPPET_LEN: usize = 24;

/// Options controlling a [`Lexer`].
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LexerOptions {
    /// The candidate window policy.
    pub window: Window,
    /// Line continuation markers used to compute logical windows.
    pub continuation: Continuation,
    /// Return suppressed tokens (marked with [`Token::suppressed`]).
    pub keep_suppressed: bool,
}

/// A tokenization failure.
///
/// Lexer errors are fatal to the tokenization pass; there is no recovery.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("lexer error at line {line}, column {column}: {message}")]
pub struct LexerError {
    /// A description of the failure.
    pub message: String,
    /// The line at which the failure occurred (1-indexed).
    pub line: usize,
    /// The column at which the failure occurred (1-indexed).
    pub column: usize,
    /// The source file, if known.
    pub file: Option<ArcStr>,
}

/// Tokenizes text according to a [`Grammar`].
#[derive(Clone)]
pub struct Lexer<K> {
    grammar: Arc<Grammar<K>>,
    options: LexerOptions,
    file: Option<ArcStr>,
}

/// An iterator over the tokens of a string.
///
/// Yields the synthetic end-of-input token last. Iteration stops after the
/// first error.
#[derive(Clone)]
pub struct Tokens<'a, K> {
    lexer: &'a Lexer<K>,
    text: &'a str,
    pos: usize,
    state: LexerState<K>,
    done: bool,
}

struct Candidate {
    index: usize,
    len: usize,
    lexeme: Option<String>,
    top: bool,
}

impl<K: Kind> Lexer<K> {
    /// Creates a lexer for the given grammar.
    pub fn new(grammar: Arc<Grammar<K>>, options: LexerOptions) -> Self {
        Self {
            grammar,
            options,
            file: None,
        }
    }

    /// Stamps every token produced by this lexer with the given file name.
    pub fn with_file(mut self, file: impl Into<ArcStr>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Sets whether suppressed tokens are returned.
    pub fn keep_suppressed(mut self, keep: bool) -> Self {
        self.options.keep_suppressed = keep;
        self
    }

    /// The file name stamped on tokens, if any.
    #[inline]
    pub fn file(&self) -> Option<&ArcStr> {
        self.file.as_ref()
    }

    /// The grammar used by this lexer.
    #[inline]
    pub fn grammar(&self) -> &Arc<Grammar<K>> {
        &self.grammar
    }

    /// The options used by this lexer.
    #[inline]
    pub fn options(&self) -> &LexerOptions {
        &self.options
    }

    /// Returns an iterator over the tokens of `text`.
    pub fn tokens<'a>(&'a self, text: &'a str) -> Tokens<'a, K> {
        self.tokens_with_state(text, LexerState::default())
    }

    /// Returns an iterator over the tokens of `text`, starting from the given state.
    pub fn tokens_with_state<'a>(&'a self, text: &'a str, state: LexerState<K>) -> Tokens<'a, K> {
        Tokens {
            lexer: self,
            text,
            pos: 0,
            state,
            done: false,
        }
    }

    /// Tokenizes `text`.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token<K>>, LexerError> {
        self.tokens(text).collect()
    }

    /// Tokenizes `text`, starting from the given state.
    pub fn tokenize_with_state(
        &self,
        text: &str,
        state: LexerState<K>,
    ) -> Result<Vec<Token<K>>, LexerError> {
        self.tokens_with_state(text, state).collect()
    }

    fn error(&self, state: &LexerState<K>, message: impl Into<String>) -> LexerError {
        LexerError {
            message: message.into(),
            line: state.line,
            column: state.column,
            file: self.file.clone(),
        }
    }

    fn window_end(&self, text: &str, pos: usize) -> usize {
        match self.options.window {
            Window::Line => physical_line_end(text, pos).1,
            Window::Logical => self.options.continuation.logical_end(text, pos),
            Window::Full => text.len(),
        }
    }

    /// Finds the winning rule for the window starting at `pos`.
    ///
    /// A dynamic rule whose matcher fails only raises its error if no top
    /// rule matches.
    fn select(
        &self,
        text: &str,
        pos: usize,
        state: &LexerState<K>,
    ) -> Result<Candidate, LexerError> {
        let window = &text[pos..self.window_end(text, pos)];
        let mut best: Option<Candidate> = None;
        let mut failure: Option<String> = None;

        for (index, compiled) in self.grammar.rules.iter().enumerate() {
            let rule = &compiled.rule;
            if !rule.applies(state) {
                continue;
            }
            let candidate = match rule {
                Rule::Static(_) => compiled
                    .regex
                    .find(window)
                    .filter(|m| m.end() > 0)
                    .map(|m| (m.end(), None)),
                Rule::Dynamic(r) => {
                    if compiled.regex.is_match(window) {
                        match (r.matcher)(window, state) {
                            Ok(Some(m)) if m.len > 0 => Some((m.len, Some(m.lexeme))),
                            Ok(_) => None,
                            Err(message) => {
                                if failure.is_none() {
                                    failure = Some(message);
                                }
                                None
                            }
                        }
                    } else {
                        None
                    }
                }
            };
            let Some((len, lexeme)) = candidate else {
                continue;
            };
            let top = rule.is_top();
            let better = match &best {
                None => true,
                Some(b) => (top && !b.top) || (top == b.top && len > b.len),
            };
            if better {
                best = Some(Candidate {
                    index,
                    len,
                    lexeme,
                    top,
                });
            }
        }

        match (best, failure) {
            (Some(best), _) if best.top => Ok(best),
            (_, Some(message)) => Err(self.error(state, message)),
            (Some(best), None) => Ok(best),
            (None, None) => {
                let snippet: String = window
                    .chars()
                    .take_while(|c| *c != '\n' && *c != '\r')
                    .take(ERROR_SNIPPET_LEN)
                    .collect();
                Err(self.error(state, format!("no rule matches `{snippet}`")))
            }
        }
    }
}

impl<K: Kind> Tokens<'_, K> {
    /// The current lexer state.
    #[inline]
    pub fn state(&self) -> &LexerState<K> {
        &self.state
    }

    /// Returns the next token without advancing.
    pub fn peek(&self) -> Option<Result<Token<K>, LexerError>> {
        self.clone().next()
    }

    /// Matches one token, advancing the cursor and state.
    ///
    /// Returns the token along with whether it was emitted.
    fn step(&mut self) -> Result<(Token<K>, Emit), LexerError> {
        self.state.full_match = false;
        self.state.line_break_follows = false;
        let candidate = self.lexer.select(self.text, self.pos, &self.state)?;
        let rule = &self.lexer.grammar.rules[candidate.index].rule;

        let start = self.pos;
        let end = start + candidate.len;
        let raw = &self.text[start..end];
        let (content_end, _) = physical_line_end(self.text, start);
        self.state.full_match = end >= content_end;
        self.state.line_break_follows = matches!(self.text.as_bytes().get(end), Some(b'\n' | b'\r'));

        let lexeme = candidate.lexeme.unwrap_or_else(|| raw.to_string());
        let emit = rule.decide(&mut self.state, &lexeme);
        tracing::trace!(rule = %rule.name(), len = candidate.len, ?emit, "matched rule");

        let token = Token {
            kind: rule.kind(),
            lexeme: ArcStr::from(lexeme),
            span: start..end,
            line: self.state.line,
            column: self.state.column,
            file: self.lexer.file.clone(),
            suppressed: emit == Emit::Skip,
        };

        self.state.advance(raw);
        if emit == Emit::Token {
            self.state.previous = Some(token.kind);
        }
        self.pos = end;
        Ok((token, emit))
    }
}

impl<K: Kind> Iterator for Tokens<'_, K> {
    type Item = Result<Token<K>, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.pos >= self.text.len() {
                self.done = true;
                return Some(Ok(Token {
                    kind: self.lexer.grammar.eof,
                    lexeme: ArcStr::new(),
                    span: self.text.len()..self.text.len(),
                    line: self.state.line,
                    column: self.state.column,
                    file: self.lexer.file.clone(),
                    suppressed: false,
                }));
            }
            match self.step() {
                Ok((token, emit)) => {
                    if emit == Emit::Token || self.lexer.options.keep_suppressed {
                        return Some(Ok(token));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
