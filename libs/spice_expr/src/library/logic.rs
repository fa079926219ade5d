use super::sgn;
use crate::error::EvalError;
use crate::function::{Arity, Function};
use crate::scope::Scope;

pub(super) fn register(scope: &mut Scope<'_>) {
    for name in ["sgn", "sign"] {
        scope.define_function(
            Function::evaluated(name, Arity::Fixed(1), |args, _| Ok(sgn(args[0])))
                .with_derivative(|_, _| Ok(vec![0.0])),
        );
    }

    scope.define_function(Function::evaluated("min", Arity::AtLeast(1), |args, _| {
        Ok(args.iter().copied().fold(f64::INFINITY, f64::min))
    }));
    scope.define_function(Function::evaluated("max", Arity::AtLeast(1), |args, _| {
        Ok(args.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }));
    scope.define_function(Function::evaluated("limit", Arity::Fixed(3), |args, _| {
        let (lo, hi) = (args[1].min(args[2]), args[1].max(args[2]));
        Ok(args[0].clamp(lo, hi))
    }));

    scope.define_function(Function::evaluated("if", Arity::Fixed(3), |args, _| {
        Ok(if args[0] != 0.0 { args[1] } else { args[2] })
    }));

    scope.define_function(Function::evaluated("round", Arity::Fixed(1), |args, _| {
        Ok(args[0].round())
    }));
    scope.define_function(Function::evaluated("int", Arity::Fixed(1), |args, _| {
        Ok(args[0].trunc())
    }));
    scope.define_function(Function::evaluated("nint", Arity::Fixed(1), |args, _| {
        Ok(args[0].round_ties_even())
    }));
    scope.define_function(
        Function::evaluated("u", Arity::Fixed(1), |args, _| {
            Ok(if args[0] > 0.0 { 1.0 } else { 0.0 })
        })
        .with_derivative(|_, _| Ok(vec![0.0])),
    );
    scope.define_function(
        Function::evaluated("uramp", Arity::Fixed(1), |args, _| Ok(args[0].max(0.0)))
            .with_derivative(|args, _| Ok(vec![if args[0] > 0.0 { 1.0 } else { 0.0 }])),
    );
    scope.define_function(Function::evaluated("mod", Arity::Fixed(2), |args, _| {
        if args[1] == 0.0 {
            return Err(EvalError::function("mod", "division by zero"));
        }
        Ok(args[0] % args[1])
    }));

    scope.define_function(Function::raw("def", Arity::Fixed(1), |args, ctx| {
        Ok(if ctx.scope.is_defined(&args[0]) { 1.0 } else { 0.0 })
    }));
    scope.define_function(Function::raw("lazy", Arity::Fixed(1), |args, ctx| {
        let child = ctx.scope.child();
        child.evaluate_with(&args[0], ctx.simulation)
    }));
}
