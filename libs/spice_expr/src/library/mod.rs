//! The function library registered in every root scope.
//!
//! Functions whose numeric semantics differ between simulators capture the
//! scope's [`Dialect`](crate::Dialect) when they are registered.

use crate::error::{EvalError, Result};
use crate::scope::Scope;

mod logic;
mod math;
mod poly;
mod random;
mod table;

pub use poly::Polynomial;
pub use table::{Table, TablePartials};

/// Registers the whole library in `scope`.
pub fn register(scope: &mut Scope<'_>) {
    math::register(scope);
    logic::register(scope);
    random::register(scope);
    table::register(scope);
    poly::register(scope);
}

/// The sign of `x`, with `sgn(0) = 0`.
pub(crate) fn sgn(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Checks that a variadic call received at most `max` arguments.
pub(crate) fn at_most(name: &str, args: &[f64], max: usize) -> Result<()> {
    if args.len() > max {
        Err(EvalError::Arity {
            name: name.to_string(),
            expected: format!("at most {max}"),
            found: args.len(),
        })
    } else {
        Ok(())
    }
}
