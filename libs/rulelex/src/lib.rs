//! A rule-driven lexer engine.
//!
//! A [`Grammar`] is an ordered list of [`Rule`]s. At every position, the
//! [`Lexer`] offers a candidate window of text to each applicable rule and
//! keeps the longest match, unless a rule marked as `top` matched, in which
//! case the longest top rule wins. Equal-length matches go to the rule
//! declared first.
//!
//! Static rules are regular expressions that may reference named internal
//! patterns (`<DIGIT>`), expanded when the grammar is built. Dynamic rules
//! compute their match procedurally, which makes non-regular constructs such
//! as balanced brackets expressible.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use rulelex::{GrammarBuilder, Lexer, LexerOptions, StaticRule};
//!
//! #[derive(Copy, Clone, Debug, Eq, PartialEq)]
//! enum Kind {
//!     Number,
//!     Word,
//!     Space,
//!     Eof,
//! }
//!
//! let mut builder = GrammarBuilder::new(Kind::Eof);
//! builder
//!     .pattern("DIGIT", "[0-9]")
//!     .rule(StaticRule::new("space", Kind::Space, "[ ]+").top().skip())
//!     .rule(StaticRule::new("number", Kind::Number, "<DIGIT>+"))
//!     .rule(StaticRule::new("word", Kind::Word, "[a-z]+"));
//! let lexer = Lexer::new(Arc::new(builder.build().unwrap()), LexerOptions::default());
//!
//! let kinds = lexer
//!     .tokenize("abc 123")
//!     .unwrap()
//!     .into_iter()
//!     .map(|t| t.kind)
//!     .collect::<Vec<_>>();
//! assert_eq!(kinds, vec![Kind::Word, Kind::Number, Kind::Eof]);
//! ```
#![warn(missing_docs)]

use lazy_static::lazy_static;
use regex::Regex;

pub mod cache;
pub mod grammar;
pub mod lexer;
pub mod lines;
pub mod rule;
pub mod state;
pub mod token;
#[cfg(test)]
mod tests;

pub use cache::GrammarCache;
pub use grammar::{Grammar, GrammarBuilder, GrammarError};
pub use lexer::{Lexer, LexerError, LexerOptions, Tokens};
pub use lines::{Continuation, LogicalLine, LogicalLines, Window};
pub use rule::{DynamicMatch, DynamicRule, Emit, Rule, StaticRule};
pub use state::LexerState;
pub use token::{Kind, Token};

lazy_static! {
    /// Matches references to internal patterns inside rule patterns.
    pub static ref PATTERN_REF_REGEX: Regex = Regex::new(r"<([A-Z_][A-Z0-9_]*)>").unwrap();
}
