//! Tokens produced by the lexer.

use std::fmt::{Debug, Display};
use std::ops::Range;

use arcstr::ArcStr;

/// A token kind.
///
/// Grammars are generic over the kind of token they produce.
/// Any small, copyable enum satisfies this trait.
pub trait Kind: Copy + Eq + Debug + Send + Sync + 'static {}

impl<T: Copy + Eq + Debug + Send + Sync + 'static> Kind for T {}

/// A single token.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Token<K> {
    /// The kind of the token.
    pub kind: K,
    /// The matched text.
    ///
    /// For most rules this is exactly the raw source text of the token.
    /// Procedural rules may post-process their capture (for example,
    /// removing line continuation markers), in which case the raw text is
    /// still available through [`Token::span`].
    pub lexeme: ArcStr,
    /// The byte range of the token in the source text.
    pub span: Range<usize>,
    /// The line on which the token starts (1-indexed).
    pub line: usize,
    /// The column at which the token starts (1-indexed, in characters).
    pub column: usize,
    /// The source file the token came from, if known.
    pub file: Option<ArcStr>,
    /// Whether the token was matched by a rule that suppresses its output.
    ///
    /// Suppressed tokens are only returned when the lexer is configured
    /// to keep them.
    pub suppressed: bool,
}

impl<K: Kind> Token<K> {
    /// Returns the raw source text of this token.
    #[inline]
    pub fn raw<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }

    /// Returns `true` if this token has the given kind.
    #[inline]
    pub fn is(&self, kind: K) -> bool {
        self.kind == kind
    }
}

impl<K: Debug> Display for Token<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}:")?;
        }
        write!(
            f,
            "{}:{} {:?} {:?}",
            self.line, self.column, self.kind, self.lexeme
        )
    }
}
