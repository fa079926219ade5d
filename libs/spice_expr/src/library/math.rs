use num_complex::Complex64;

use super::sgn;
use crate::dialect::Dialect;
use crate::function::{Arity, Function};
use crate::scope::Scope;

/// Values closer to zero than this are reported as zero by complex
/// evaluation.
const SNAP: f64 = 1e-15;

fn snap(x: f64) -> f64 {
    if x.abs() < SNAP {
        0.0
    } else {
        x
    }
}

pub(crate) fn pow(dialect: Dialect, x: f64, y: f64) -> f64 {
    match dialect {
        Dialect::Spice3f5 => x.powf(y),
        Dialect::LtSpice => {
            if x < 0.0 {
                x.powf(y.trunc())
            } else {
                snap(Complex64::new(x, 0.0).powf(y).re)
            }
        }
        Dialect::SmartSpice => x.abs().powf(y.trunc()),
        Dialect::HSpice => x.powf(y.trunc()),
    }
}

/// The partial derivatives of [`pow`] with respect to `x` and `y`.
///
/// Where the dialect truncates the exponent, the value is piecewise constant
/// in `y` and its `y` partial is zero.
pub(crate) fn pow_partials(dialect: Dialect, x: f64, y: f64) -> [f64; 2] {
    let real = |x: f64, y: f64| [y * x.powf(y - 1.0), x.powf(y) * x.ln()];
    match dialect {
        Dialect::Spice3f5 => real(x, y),
        Dialect::LtSpice if x >= 0.0 => real(x, y),
        Dialect::LtSpice | Dialect::HSpice => {
            let t = y.trunc();
            [t * x.powf(t - 1.0), 0.0]
        }
        Dialect::SmartSpice => {
            let t = y.trunc();
            [t * x.abs().powf(t - 1.0) * sgn(x), 0.0]
        }
    }
}

pub(crate) fn sqrt(dialect: Dialect, x: f64) -> f64 {
    match dialect {
        Dialect::Spice3f5 => x.sqrt(),
        Dialect::LtSpice => snap(Complex64::new(x, 0.0).sqrt().re),
        Dialect::SmartSpice => x.abs().sqrt(),
        Dialect::HSpice if x < 0.0 => -(-x).sqrt(),
        Dialect::HSpice => x.sqrt(),
    }
}

pub(crate) fn pwr(dialect: Dialect, x: f64, y: f64) -> f64 {
    match dialect {
        Dialect::LtSpice => x.abs().powf(y),
        _ => sgn(x) * x.abs().powf(y),
    }
}

fn log_with(dialect: Dialect, x: f64, log: fn(f64) -> f64) -> f64 {
    match dialect {
        Dialect::SmartSpice => sgn(x) * log(x.abs()),
        _ => log(x),
    }
}

pub(crate) fn db(dialect: Dialect, x: f64) -> f64 {
    match dialect {
        Dialect::LtSpice => 20.0 * x.abs().log10(),
        _ => sgn(x) * 20.0 * x.abs().log10(),
    }
}

pub(super) fn register(scope: &mut Scope<'_>) {
    let dialect = scope.dialect();

    let power = |name: &'static str| {
        Function::evaluated(name, Arity::Fixed(2), move |args, _| {
            Ok(pow(dialect, args[0], args[1]))
        })
        .with_derivative(move |args, _| Ok(pow_partials(dialect, args[0], args[1]).to_vec()))
    };
    scope.define_function(power("pow"));
    scope.define_function(power("**").infix());

    scope.define_function(
        Function::evaluated("sqrt", Arity::Fixed(1), move |args, _| {
            Ok(sqrt(dialect, args[0]))
        })
        .with_derivative(|args, _| Ok(vec![0.5 / args[0].sqrt()])),
    );

    for name in ["pwr", "pwrs"] {
        scope.define_function(Function::evaluated(name, Arity::Fixed(2), move |args, _| {
            Ok(pwr(dialect, args[0], args[1]))
        }));
    }

    for name in ["log", "ln"] {
        scope.define_function(
            Function::evaluated(name, Arity::Fixed(1), move |args, _| {
                Ok(log_with(dialect, args[0], f64::ln))
            })
            .with_derivative(|args, _| Ok(vec![1.0 / args[0]])),
        );
    }
    scope.define_function(
        Function::evaluated("log10", Arity::Fixed(1), move |args, _| {
            Ok(log_with(dialect, args[0], f64::log10))
        })
        .with_derivative(|args, _| Ok(vec![1.0 / (args[0] * std::f64::consts::LN_10)])),
    );
    scope.define_function(Function::evaluated("db", Arity::Fixed(1), move |args, _| {
        Ok(db(dialect, args[0]))
    }));
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn sqrt_of_negative_by_dialect() {
        assert!(sqrt(Dialect::Spice3f5, -4.0).is_nan());
        assert_eq!(sqrt(Dialect::LtSpice, -4.0), 0.0);
        assert_relative_eq!(sqrt(Dialect::SmartSpice, -4.0), 2.0);
        assert_relative_eq!(sqrt(Dialect::HSpice, -4.0), -2.0);
        for dialect in [
            Dialect::Spice3f5,
            Dialect::LtSpice,
            Dialect::SmartSpice,
            Dialect::HSpice,
        ] {
            assert_relative_eq!(sqrt(dialect, 9.0), 3.0, max_relative = 1e-12);
        }
    }

    #[test]
    fn pow_truncates_exponents() {
        assert!(pow(Dialect::Spice3f5, -8.0, 1.0 / 3.0).is_nan());
        assert_relative_eq!(pow(Dialect::LtSpice, -2.0, 2.7), 4.0);
        assert_relative_eq!(pow(Dialect::LtSpice, 4.0, 0.5), 2.0, max_relative = 1e-12);
        assert_relative_eq!(pow(Dialect::SmartSpice, -2.0, 3.9), 8.0);
        assert_relative_eq!(pow(Dialect::HSpice, -2.0, 3.9), -8.0);
        assert_relative_eq!(pow(Dialect::HSpice, 2.0, 0.5), 1.0);
    }

    #[test]
    fn pow_partials_follow_dialect() {
        let [dx, dy] = pow_partials(Dialect::Spice3f5, 2.0, 3.0);
        assert_relative_eq!(dx, 12.0);
        assert_relative_eq!(dy, 8.0 * 2f64.ln());
        assert!(pow_partials(Dialect::Spice3f5, -2.0, 3.5)[0].is_nan());

        assert_eq!(pow_partials(Dialect::HSpice, -2.0, 3.9), [12.0, 0.0]);
        assert_eq!(pow_partials(Dialect::LtSpice, -2.0, 3.9), [12.0, 0.0]);
        assert_eq!(pow_partials(Dialect::SmartSpice, -2.0, 3.9), [-12.0, 0.0]);
        assert_eq!(pow_partials(Dialect::SmartSpice, 2.0, 3.9), [12.0, 0.0]);
    }

    #[test]
    fn signed_power_and_logs() {
        assert_relative_eq!(pwr(Dialect::Spice3f5, -2.0, 2.0), -4.0);
        assert_relative_eq!(pwr(Dialect::LtSpice, -2.0, 2.0), 4.0);
        assert_relative_eq!(
            log_with(Dialect::SmartSpice, -100.0, f64::log10),
            -2.0,
            max_relative = 1e-12
        );
        assert!(log_with(Dialect::HSpice, -100.0, f64::log10).is_nan());
        assert_relative_eq!(db(Dialect::Spice3f5, -10.0), -20.0, max_relative = 1e-12);
        assert_relative_eq!(db(Dialect::LtSpice, -10.0), 20.0, max_relative = 1e-12);
    }
}
