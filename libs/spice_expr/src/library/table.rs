//! Piecewise-linear lookup tables.

use crate::error::EvalError;
use crate::function::{Arity, Function};
use crate::scope::Scope;

/// A piecewise-linear function through a set of points.
///
/// Between points the table interpolates linearly; outside the covered range
/// it extrapolates flat, returning the value of the nearest end point.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    points: Vec<(f64, f64)>,
}

/// The partial derivatives of a table lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct TablePartials {
    /// The derivative with respect to the lookup coordinate.
    pub x: f64,
    /// The derivatives with respect to each point's value, in sorted point
    /// order.
    pub y: Vec<f64>,
}

impl Table {
    /// Creates a table from `(x, y)` points in any order.
    ///
    /// # Examples
    ///
    /// ```
    /// use spice_expr::Table;
    ///
    /// let table = Table::new([(3.0, 30.0), (1.0, 10.0), (2.0, 20.0)]);
    /// assert_eq!(table.value(2.5), 25.0);
    /// assert_eq!(table.value(0.0), 10.0);
    /// ```
    pub fn new(points: impl IntoIterator<Item = (f64, f64)>) -> Self {
        let mut points: Vec<_> = points.into_iter().collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// The points of the table, sorted by `x`.
    #[inline]
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Returns the index `i` such that `x` lies in `[x[i-1], x[i])`, or `None`
    /// if `x` is outside the interior of the table or NaN.
    fn segment(&self, x: f64) -> Option<usize> {
        let (first, last) = (self.points.first()?, self.points.last()?);
        if x.is_nan() || x <= first.0 || x >= last.0 {
            return None;
        }
        match self.points.partition_point(|p| p.0 <= x) {
            0 => None,
            i => Some(i),
        }
    }

    fn nearest_end(&self, x: f64) -> Option<usize> {
        let first = self.points.first()?;
        Some(if x <= first.0 { 0 } else { self.points.len() - 1 })
    }

    /// Looks up the table at `x`.
    ///
    /// Returns NaN for an empty table or a NaN `x`.
    pub fn value(&self, x: f64) -> f64 {
        if x.is_nan() {
            return f64::NAN;
        }
        match self.segment(x) {
            Some(i) => {
                let (x0, y0) = self.points[i - 1];
                let (x1, y1) = self.points[i];
                if x == x0 {
                    y0
                } else {
                    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
                }
            }
            None => self
                .nearest_end(x)
                .map(|i| self.points[i].1)
                .unwrap_or(f64::NAN),
        }
    }

    /// Computes the partial derivatives of [`Table::value`] at `x`.
    ///
    /// Every partial is NaN for a NaN `x`.
    pub fn partials(&self, x: f64) -> TablePartials {
        if x.is_nan() {
            return TablePartials {
                x: f64::NAN,
                y: vec![f64::NAN; self.points.len()],
            };
        }
        let mut y = vec![0.0; self.points.len()];
        let dx = match self.segment(x) {
            Some(i) => {
                let (x0, y0) = self.points[i - 1];
                let (x1, y1) = self.points[i];
                let t = (x - x0) / (x1 - x0);
                y[i - 1] = 1.0 - t;
                y[i] = t;
                (y1 - y0) / (x1 - x0)
            }
            None => {
                if let Some(i) = self.nearest_end(x) {
                    y[i] = 1.0;
                }
                0.0
            }
        };
        TablePartials { x: dx, y }
    }
}

pub(super) fn register(scope: &mut Scope<'_>) {
    // table(x, x1, y1, x2, y2, ...)
    scope.define_function(Function::raw("table", Arity::AtLeast(3), |args, ctx| {
        if args.len() % 2 == 0 {
            return Err(EvalError::function(
                "table",
                "expected a lookup value followed by x/y pairs",
            ));
        }
        // Arguments may reference names the caller does not want defined.
        let child = ctx.scope.child();
        let values = args
            .iter()
            .map(|arg| child.evaluate_with(arg, ctx.simulation))
            .collect::<Result<Vec<_>, _>>()?;
        let table = Table::new(values[1..].chunks_exact(2).map(|p| (p[0], p[1])));
        Ok(table.value(values[0]))
    }));
}
