//! SPICE netlist tokenizer.
//!
//! Tokenizes SPICE-family netlists with a [`rulelex`] grammar built from
//! [`SpiceLexerOptions`], and converts value and expression tokens to numbers
//! through [`spice_expr`].
//!
//! # Examples
//!
//! ```
//! use spice::{SpiceLexer, SpiceLexerOptions, TokenKind};
//!
//! let lexer = SpiceLexer::new(SpiceLexerOptions::default()).unwrap();
//! let tokens = lexer.tokenize("R1 a b {2*r}\n+ tc=0.01").unwrap();
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![
//!         TokenKind::Word,
//!         TokenKind::Word,
//!         TokenKind::Word,
//!         TokenKind::ExpressionBracket,
//!         TokenKind::Word,
//!         TokenKind::Equal,
//!         TokenKind::Value,
//!         TokenKind::Eof,
//!     ]
//! );
//! ```
#![warn(missing_docs)]

use std::sync::Arc;

use arcstr::ArcStr;
use rulelex::{Continuation, GrammarCache, Lexer, LexerOptions, Tokens};

pub mod error;
pub mod grammar;
pub mod value;

pub use error::{Result, SpiceError};
pub use grammar::{grammar, SpiceLexerOptions, TokenKind};

/// A SPICE token.
pub type Token = rulelex::Token<TokenKind>;

/// A cache of compiled SPICE grammars keyed by their options.
pub type SpiceGrammarCache = GrammarCache<SpiceLexerOptions, TokenKind>;

/// A lexer for SPICE netlists.
#[derive(Clone)]
pub struct SpiceLexer {
    options: SpiceLexerOptions,
    lexer: Lexer<TokenKind>,
}

fn lexer_options(options: &SpiceLexerOptions) -> LexerOptions {
    LexerOptions {
        window: options.window,
        continuation: Continuation::spice(),
        keep_suppressed: false,
    }
}

impl SpiceLexer {
    /// Creates a lexer, compiling a fresh grammar.
    pub fn new(options: SpiceLexerOptions) -> Result<Self> {
        let grammar = Arc::new(grammar(&options)?);
        let lexer = Lexer::new(grammar, lexer_options(&options));
        Ok(Self { options, lexer })
    }

    /// Creates a lexer, reusing the grammar compiled for equal options if
    /// `cache` holds one.
    pub fn with_cache(cache: &SpiceGrammarCache, options: SpiceLexerOptions) -> Result<Self> {
        let grammar = cache.get_or_build(&options, grammar)?;
        let lexer = Lexer::new(grammar, lexer_options(&options));
        Ok(Self { options, lexer })
    }

    /// Tags every token with the given source file name.
    pub fn with_file(mut self, file: impl Into<ArcStr>) -> Self {
        self.lexer = self.lexer.with_file(file);
        self
    }

    /// Also returns skipped tokens (whitespace, continuations and, unless
    /// kept, comments), marked as suppressed.
    pub fn keep_suppressed(mut self, keep: bool) -> Self {
        self.lexer = self.lexer.keep_suppressed(keep);
        self
    }

    /// The options the lexer was built with.
    #[inline]
    pub fn options(&self) -> &SpiceLexerOptions {
        &self.options
    }

    /// The underlying generic lexer.
    #[inline]
    pub fn lexer(&self) -> &Lexer<TokenKind> {
        &self.lexer
    }

    /// Returns an iterator over the tokens of `text`.
    pub fn tokens<'a>(&'a self, text: &'a str) -> Tokens<'a, TokenKind> {
        self.lexer.tokens(text)
    }

    /// Tokenizes `text`, ending with an [`TokenKind::Eof`] token.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let tokens = self.lexer.tokenize(text)?;
        tracing::debug!(count = tokens.len(), "tokenized SPICE text");
        Ok(tokens)
    }
}
