//! Errors.

use rulelex::{GrammarError, LexerError};
use spice_expr::EvalError;
use thiserror::Error;

use crate::grammar::TokenKind;

/// The result type of this crate.
pub type Result<T> = std::result::Result<T, SpiceError>;

/// An error tokenizing or evaluating SPICE text.
#[derive(Debug, Error)]
pub enum SpiceError {
    /// The SPICE grammar failed to build.
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    /// The input could not be tokenized.
    #[error(transparent)]
    Lexer(#[from] LexerError),
    /// An expression could not be evaluated.
    #[error("at line {line}: {source}")]
    Eval {
        /// The line of the token holding the expression.
        line: usize,
        /// The underlying error.
        #[source]
        source: EvalError,
    },
    /// The token does not denote a number.
    #[error("{kind:?} token `{lexeme}` at line {line} has no numeric value")]
    NotAValue {
        /// The token kind.
        kind: TokenKind,
        /// The token text.
        lexeme: String,
        /// The line of the token.
        line: usize,
    },
}
