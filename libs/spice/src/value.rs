//! Numeric values of tokens.
//!
//! The evaluator expects bare expressions, so the delimiters of bracketed
//! and quoted expressions are removed here before evaluation.

use spice_expr::number::parse_literal;
use spice_expr::Scope;

use crate::error::{Result, SpiceError};
use crate::grammar::{strip_continuations, TokenKind};
use crate::Token;

/// Returns the expression text of a token without its outer delimiters.
///
/// `{...}` and `'...'` lose their delimiters and continuation markers; all
/// other tokens yield their lexeme unchanged.
///
/// # Examples
///
/// ```
/// use spice::{SpiceLexer, SpiceLexerOptions};
/// use spice::value::expression_text;
///
/// let lexer = SpiceLexer::new(SpiceLexerOptions::default()).unwrap();
/// let tokens = lexer.tokenize("{w * 2}").unwrap();
/// assert_eq!(expression_text(&tokens[0]), "w * 2");
/// ```
pub fn expression_text(token: &Token) -> String {
    let lexeme = token.lexeme.as_str();
    let inner = match token.kind {
        TokenKind::ExpressionBracket => lexeme
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(lexeme),
        TokenKind::SingleQuoted | TokenKind::BooleanExpression => {
            let (open, close) = if token.kind == TokenKind::SingleQuoted {
                ('\'', '\'')
            } else {
                ('(', ')')
            };
            lexeme
                .strip_prefix(open)
                .and_then(|s| s.strip_suffix(close))
                .unwrap_or(lexeme)
        }
        _ => lexeme,
    };
    strip_continuations(inner).trim().to_string()
}

/// Evaluates the numeric value of a token.
///
/// Values and percentages are converted directly; expressions and names are
/// evaluated in `scope`.
pub fn token_value(token: &Token, scope: &Scope<'_>) -> Result<f64> {
    let eval = |text: &str| {
        scope.evaluate(text).map_err(|source| SpiceError::Eval {
            line: token.line,
            source,
        })
    };
    let not_a_value = || SpiceError::NotAValue {
        kind: token.kind,
        lexeme: token.lexeme.to_string(),
        line: token.line,
    };
    match token.kind {
        TokenKind::Value => parse_literal(&token.lexeme).ok_or_else(not_a_value),
        TokenKind::Percent => token
            .lexeme
            .strip_suffix('%')
            .and_then(parse_literal)
            .map(|v| v / 100.0)
            .ok_or_else(not_a_value),
        TokenKind::ExpressionBracket
        | TokenKind::SingleQuoted
        | TokenKind::BooleanExpression => eval(&expression_text(token)),
        TokenKind::Word | TokenKind::Identifier | TokenKind::Reference => eval(&token.lexeme),
        _ => Err(not_a_value()),
    }
}
