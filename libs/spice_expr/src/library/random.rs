//! Statistical functions for Monte Carlo runs.
//!
//! Every function draws from the generator owned by the root scope, so a
//! seeded root scope reproduces the same sequence.

use std::f64::consts::PI;

use rand::Rng;

use super::at_most;
use crate::function::{Arity, Function};
use crate::scope::Scope;

/// Draws a standard normal sample with the Box-Muller transform.
fn standard_normal(rng: &mut impl Rng) -> f64 {
    // 1 - [0, 1) keeps u1 away from zero.
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Draws a sample uniformly distributed in [-1, 1).
fn symmetric_uniform(rng: &mut impl Rng) -> f64 {
    rng.gen_range(-1.0..1.0)
}

pub(super) fn register(scope: &mut Scope<'_>) {
    scope.define_function(Function::evaluated("random", Arity::Fixed(0), |_, ctx| {
        Ok(ctx.scope.with_rng(|rng| rng.gen::<f64>()))
    }));

    // gauss(nominal, relative variation, sigma = 1)
    scope.define_function(Function::evaluated("gauss", Arity::AtLeast(2), |args, ctx| {
        at_most("gauss", args, 3)?;
        let sigma = args.get(2).copied().unwrap_or(1.0);
        let z = ctx.scope.with_rng(|rng| standard_normal(rng));
        Ok(args[0] + args[0] * args[1] / sigma * z)
    }));
    // agauss(nominal, absolute variation, sigma = 1)
    scope.define_function(Function::evaluated("agauss", Arity::AtLeast(2), |args, ctx| {
        at_most("agauss", args, 3)?;
        let sigma = args.get(2).copied().unwrap_or(1.0);
        let z = ctx.scope.with_rng(|rng| standard_normal(rng));
        Ok(args[0] + args[1] / sigma * z)
    }));

    scope.define_function(Function::evaluated("unif", Arity::Fixed(2), |args, ctx| {
        let u = ctx.scope.with_rng(|rng| symmetric_uniform(rng));
        Ok(args[0] + args[0] * args[1] * u)
    }));
    scope.define_function(Function::evaluated("aunif", Arity::Fixed(2), |args, ctx| {
        let u = ctx.scope.with_rng(|rng| symmetric_uniform(rng));
        Ok(args[0] + args[1] * u)
    }));
    scope.define_function(Function::evaluated("flat", Arity::Fixed(1), |args, ctx| {
        let u = ctx.scope.with_rng(|rng| symmetric_uniform(rng));
        Ok(args[0] * u)
    }));
}
