//! Function descriptors.

use std::any::Any;
use std::fmt::{Debug, Display};
use std::sync::Arc;

use arcstr::ArcStr;

use crate::error::{EvalError, Result};
use crate::scope::Scope;

/// The context passed to a function call.
#[derive(Clone, Copy)]
pub struct CallContext<'a> {
    /// The scope in which the call is evaluated.
    pub scope: &'a Scope<'a>,
    /// An opaque handle to a live simulation, passed through from the host.
    pub simulation: Option<&'a dyn Any>,
}

/// A function taking evaluated arguments.
pub type EvaluatedFn = Arc<dyn Fn(&[f64], &CallContext<'_>) -> Result<f64> + Send + Sync>;

/// A function taking the raw text of its arguments.
pub type RawFn = Arc<dyn Fn(&[String], &CallContext<'_>) -> Result<f64> + Send + Sync>;

/// The partial derivatives of a function with respect to each argument.
pub type DerivativeFn = Arc<dyn Fn(&[f64], &CallContext<'_>) -> Result<Vec<f64>> + Send + Sync>;

/// The number of arguments a function accepts.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Arity {
    /// Exactly this many arguments.
    Fixed(usize),
    /// At least this many arguments.
    AtLeast(usize),
    /// Any number of arguments.
    Variadic,
}

/// How a function receives its arguments.
#[derive(Clone)]
pub enum Logic {
    /// Arguments are evaluated to numbers before the call.
    Evaluated(EvaluatedFn),
    /// Arguments are passed as unevaluated text ("virtual parameters").
    ///
    /// Needed by functions that act on names rather than values, such as
    /// definedness queries and circuit quantity lookups.
    Raw(RawFn),
}

/// Arguments to a function call.
#[derive(Copy, Clone, Debug)]
pub enum Arguments<'a> {
    /// Evaluated arguments.
    Values(&'a [f64]),
    /// Raw argument text.
    Raw(&'a [String]),
}

/// A function that can be registered in a [`Scope`].
#[derive(Clone)]
pub struct Function {
    name: ArcStr,
    arity: Arity,
    infix: bool,
    logic: Logic,
    derivative: Option<DerivativeFn>,
}

impl Function {
    /// Creates a function taking evaluated arguments.
    pub fn evaluated(
        name: impl Into<ArcStr>,
        arity: Arity,
        f: impl Fn(&[f64], &CallContext<'_>) -> Result<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            infix: false,
            logic: Logic::Evaluated(Arc::new(f)),
            derivative: None,
        }
    }

    /// Creates a function taking the raw text of its arguments.
    pub fn raw(
        name: impl Into<ArcStr>,
        arity: Arity,
        f: impl Fn(&[String], &CallContext<'_>) -> Result<f64> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            infix: false,
            logic: Logic::Raw(Arc::new(f)),
            derivative: None,
        }
    }

    /// Makes the function usable as a binary operator.
    ///
    /// Infix functions take exactly two evaluated arguments and bind tighter
    /// than multiplication.
    pub fn infix(mut self) -> Self {
        self.infix = true;
        self.arity = Arity::Fixed(2);
        self
    }

    /// Attaches a derivative to the function.
    pub fn with_derivative(
        mut self,
        d: impl Fn(&[f64], &CallContext<'_>) -> Result<Vec<f64>> + Send + Sync + 'static,
    ) -> Self {
        self.derivative = Some(Arc::new(d));
        self
    }

    /// The name of the function.
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The arity of the function.
    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Returns `true` if the function is a binary operator.
    #[inline]
    pub fn is_infix(&self) -> bool {
        self.infix
    }

    /// Returns `true` if the function receives raw argument text.
    #[inline]
    pub fn is_raw(&self) -> bool {
        matches!(self.logic, Logic::Raw(_))
    }

    /// Checks that `count` arguments are acceptable.
    pub fn check_arity(&self, count: usize) -> Result<()> {
        let ok = match self.arity {
            Arity::Fixed(n) => count == n,
            Arity::AtLeast(n) => count >= n,
            Arity::Variadic => true,
        };
        if ok {
            Ok(())
        } else {
            Err(EvalError::Arity {
                name: self.name.to_string(),
                expected: self.arity.to_string(),
                found: count,
            })
        }
    }

    /// Calls the function.
    pub fn call(&self, args: Arguments<'_>, ctx: &CallContext<'_>) -> Result<f64> {
        let count = match args {
            Arguments::Values(v) => v.len(),
            Arguments::Raw(r) => r.len(),
        };
        self.check_arity(count)?;
        match (&self.logic, args) {
            (Logic::Evaluated(f), Arguments::Values(v)) => f(v, ctx),
            (Logic::Raw(f), Arguments::Raw(r)) => f(r, ctx),
            (Logic::Evaluated(_), Arguments::Raw(_)) => Err(EvalError::function(
                self.name.as_str(),
                "expected evaluated arguments",
            )),
            (Logic::Raw(_), Arguments::Values(_)) => {
                Err(EvalError::function(self.name.as_str(), "expected raw arguments"))
            }
        }
    }

    /// Computes the partial derivatives of the function at `args`.
    ///
    /// Returns `None` if the function does not provide derivatives.
    pub fn derivative(&self, args: &[f64], ctx: &CallContext<'_>) -> Option<Result<Vec<f64>>> {
        let d = self.derivative.as_ref()?;
        Some(self.check_arity(args.len()).and_then(|_| d(args, ctx)))
    }
}

impl Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
            Self::Variadic => write!(f, "any number of"),
        }
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("infix", &self.infix)
            .field("raw", &self.is_raw())
            .finish_non_exhaustive()
    }
}
