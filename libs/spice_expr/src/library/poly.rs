//! SPICE `POLY` polynomials.

use std::fmt::Write;

use itertools::Itertools;

use crate::error::EvalError;
use crate::function::{Arity, Function};
use crate::scope::Scope;

/// A multivariate polynomial with coefficients in SPICE `POLY` order.
///
/// Terms are ordered by degree, and within a degree by the combinations
/// with repetition of the variables. For two variables `a` and `b` the
/// coefficients are `c0 + c1*a + c2*b + c3*a*a + c4*a*b + c5*b*b + ...`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    dimension: usize,
    coefficients: Vec<f64>,
    terms: Vec<Vec<usize>>,
}

/// The variable indices of the first `count` terms of a polynomial in
/// `dimension` variables.
fn terms(dimension: usize, count: usize) -> Vec<Vec<usize>> {
    let constant = std::iter::once(Vec::new());
    if dimension == 0 {
        return constant.take(count).collect();
    }
    constant
        .chain((1..).flat_map(move |degree| (0..dimension).combinations_with_replacement(degree)))
        .take(count)
        .collect()
}

impl Polynomial {
    /// Creates a polynomial in `dimension` variables.
    ///
    /// A one-dimensional polynomial given a single coefficient treats it as
    /// the linear coefficient, as SPICE does.
    pub fn new(dimension: usize, coefficients: impl Into<Vec<f64>>) -> Self {
        let mut coefficients = coefficients.into();
        if dimension == 1 && coefficients.len() == 1 {
            coefficients.insert(0, 0.0);
        }
        let terms = terms(dimension, coefficients.len());
        Self {
            dimension,
            coefficients,
            terms,
        }
    }

    /// The number of variables.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The coefficients, in term order.
    #[inline]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// The variable indices multiplied in each term.
    #[inline]
    pub fn terms(&self) -> &[Vec<usize>] {
        &self.terms
    }

    fn term(&self, term: &[usize], x: &[f64]) -> f64 {
        term.iter().map(|&i| x[i]).product()
    }

    /// Evaluates the polynomial.
    ///
    /// # Panics
    ///
    /// Panics if `x` has fewer than [`Polynomial::dimension`] values.
    pub fn eval(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(&self.terms)
            .map(|(c, term)| c * self.term(term, x))
            .sum()
    }

    /// The value of every term at `x`, which is the derivative of the
    /// polynomial with respect to each coefficient.
    pub fn term_values(&self, x: &[f64]) -> Vec<f64> {
        self.terms.iter().map(|term| self.term(term, x)).collect()
    }

    /// The partial derivatives with respect to each variable.
    pub fn partials(&self, x: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.dimension];
        for (c, term) in self.coefficients.iter().zip(&self.terms) {
            for (position, &var) in term.iter().enumerate() {
                let rest: f64 = term
                    .iter()
                    .enumerate()
                    .filter(|(p, _)| *p != position)
                    .map(|(_, &i)| x[i])
                    .product();
                out[var] += c * rest;
            }
        }
        out
    }

    /// Renders the polynomial as an expression over the given variable
    /// names.
    ///
    /// Zero coefficients are omitted.
    pub fn to_expression(&self, names: &[impl AsRef<str>]) -> String {
        let mut out = String::new();
        for (c, term) in self.coefficients.iter().zip(&self.terms) {
            if *c == 0.0 {
                continue;
            }
            if !out.is_empty() {
                out.push_str(" + ");
            }
            let _ = write!(out, "{c}");
            for &i in term {
                let _ = write!(out, "*{}", names[i].as_ref());
            }
        }
        if out.is_empty() {
            out.push('0');
        }
        out
    }
}

pub(super) fn register(scope: &mut Scope<'_>) {
    fn split(args: &[f64]) -> Result<(usize, &[f64], &[f64]), EvalError> {
        let n = args[0];
        if n.is_nan() || n < 1.0 || n.fract() != 0.0 {
            return Err(EvalError::function(
                "poly",
                format!("dimension must be a positive integer, got {n}"),
            ));
        }
        // Every dimension needs a controlling value and at least one
        // coefficient must follow.
        if n > args.len().saturating_sub(2) as f64 {
            return Err(EvalError::Arity {
                name: "poly".to_string(),
                expected: format!("at least {} for dimension {n}", n + 2.0),
                found: args.len(),
            });
        }
        let n = n as usize;
        Ok((n, &args[1..=n], &args[n + 1..]))
    }

    // poly(n, v1, ..., vn, c0, c1, ...)
    scope.define_function(
        Function::evaluated("poly", Arity::AtLeast(3), |args, _| {
            let (n, x, c) = split(args)?;
            Ok(Polynomial::new(n, c).eval(x))
        })
        .with_derivative(|args, _| {
            let (n, x, c) = split(args)?;
            let p = Polynomial::new(n, c);
            let mut out = vec![0.0];
            out.extend(p.partials(x));
            let terms = p.term_values(x);
            // A lone linear coefficient was shifted by one term.
            let skip = terms.len() - c.len();
            out.extend(&terms[skip..]);
            Ok(out)
        }),
    );
}
