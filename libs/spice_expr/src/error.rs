//! Evaluation errors.

use thiserror::Error;

/// The result type of evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

/// An error evaluating an expression.
///
/// Every variant carries the offending text so hosts can attach the error to
/// the originating source line.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EvalError {
    /// The expression is empty.
    #[error("empty expression")]
    Empty,
    /// A parameter is not defined in the scope chain.
    #[error("unknown parameter `{name}` in `{expression}`")]
    UnknownParameter {
        /// The parameter name.
        name: String,
        /// The expression being evaluated.
        expression: String,
    },
    /// A function is not defined in the scope chain or the built-ins.
    #[error("unknown function `{name}` in `{expression}`")]
    UnknownFunction {
        /// The function name.
        name: String,
        /// The expression being evaluated.
        expression: String,
    },
    /// A function was called with the wrong number of arguments.
    #[error("function `{name}` expects {expected} argument(s), got {found}")]
    Arity {
        /// The function name.
        name: String,
        /// A description of the accepted argument count.
        expected: String,
        /// The number of arguments supplied.
        found: usize,
    },
    /// Parentheses do not balance.
    #[error("unbalanced parentheses in `{expression}`")]
    UnbalancedParentheses {
        /// The expression being evaluated.
        expression: String,
    },
    /// A `?` without a `:` or a `:` without a `?`.
    #[error("unmatched conditional in `{expression}`")]
    UnmatchedConditional {
        /// The expression being evaluated.
        expression: String,
    },
    /// Text that cannot appear at its position.
    #[error("unexpected `{text}` at offset {offset} in `{expression}`")]
    UnexpectedText {
        /// The offending text.
        text: String,
        /// The byte offset of the offending text.
        offset: usize,
        /// The expression being evaluated.
        expression: String,
    },
    /// An operator did not find enough operands.
    #[error("missing operand in `{expression}`")]
    StackUnderflow {
        /// The expression being evaluated.
        expression: String,
    },
    /// The expression still carries its outer delimiters.
    #[error("expression `{expression}` must be stripped of its delimiters before evaluation")]
    Bracketed {
        /// The expression being evaluated.
        expression: String,
    },
    /// A function rejected its arguments.
    #[error("error in function `{name}`: {message}")]
    Function {
        /// The function name.
        name: String,
        /// A description of the failure.
        message: String,
    },
}

impl EvalError {
    /// Creates a [`EvalError::Function`] error.
    pub fn function(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Function {
            name: name.into(),
            message: message.into(),
        }
    }
}
