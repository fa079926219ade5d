//! SPICE expression evaluation.
//!
//! Expressions are evaluated directly from their text by a single-pass
//! operator-precedence evaluator against a [`Scope`]. Scopes hold
//! parameters and functions, fall through to their parent on lookup misses,
//! and keep dependent expressions up to date when parameters change.
//!
//! The numeric behavior of power, root and logarithm functions follows the
//! scope's [`Dialect`].
//!
//! # Examples
//!
//! ```
//! use spice_expr::{Dialect, Scope};
//!
//! let mut scope = Scope::new(Dialect::default());
//! scope.set_parameter("vdd", 1.8).unwrap();
//! assert_eq!(scope.evaluate("vdd / 2").unwrap(), 0.9);
//! assert_eq!(scope.evaluate("2**3 - 1").unwrap(), 7.0);
//! assert_eq!(scope.evaluate("vdd > 1 ? 1k : 2k").unwrap(), 1000.0);
//!
//! let child = scope.child();
//! assert_eq!(child.evaluate("table(vdd, 0,0, 3.6,1)").unwrap(), 0.5);
//! ```
#![warn(missing_docs)]

pub mod dialect;
pub mod error;
pub mod eval;
pub mod function;
pub mod library;
pub mod number;
pub mod scope;
#[cfg(test)]
mod tests;

pub use dialect::{Dialect, ParseDialectError};
pub use error::{EvalError, Result};
pub use eval::{evaluate, FreeNames};
pub use function::{Arguments, Arity, CallContext, Function, Logic};
pub use library::{Polynomial, Table, TablePartials};
pub use scope::{DynamicCallback, DynamicExpression, Scope};

/// Collects the names referenced by `text` against the default function
/// library.
///
/// Every called function is reported, including library and built-in ones.
pub fn free_names(text: &str) -> Result<FreeNames> {
    Scope::new(Dialect::default()).free_names(text)
}
