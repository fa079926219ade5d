use std::sync::{Arc, Mutex};

use approx::assert_relative_eq;
use test_log::test;

use crate::*;

fn eval(text: &str) -> f64 {
    Scope::new(Dialect::default()).evaluate(text).unwrap()
}

#[test]
fn precedence() {
    assert_eq!(eval("2+3*4"), 14.0);
    assert_eq!(eval("(2+3)*4"), 20.0);
    assert_eq!(eval("2**3"), 8.0);
    assert_eq!(eval("2**3-1"), 7.0);
    assert_eq!(eval("2^3^2"), 64.0);
    assert_eq!(eval("-2^2"), -4.0);
    assert_eq!(eval("2*-3"), -6.0);
    assert_eq!(eval("10-4-3"), 3.0);
    assert_eq!(eval("8/4/2"), 1.0);
    assert_eq!(eval("7 % 4"), 3.0);
    assert_eq!(eval("1 + 2 < 4 && 5 >= 5"), 1.0);
    assert_eq!(eval("0 || !0"), 1.0);
    assert_eq!(eval("3 == 3 != 0"), 1.0);
    assert_eq!(eval("2 <> 3"), 1.0);
}

#[test]
fn ternary() {
    assert_eq!(eval("1 ? 2 : 3"), 2.0);
    assert_eq!(eval("0 ? 2 : 3"), 3.0);
    assert_eq!(eval("0 ? 1 : 0 ? 2 : 3"), 3.0);
    assert_eq!(eval("1 ? 0 ? 4 : 5 : 6"), 5.0);
    assert_eq!(eval("2 > 1 ? 10 + 1 : 20"), 11.0);
    assert_eq!(eval("max(1 ? 2 : 3, 1)"), 2.0);
}

#[test]
fn literals() {
    assert_relative_eq!(eval("1,99666833293656"), 1.99666833293656);
    assert_relative_eq!(eval("10k + 1meg"), 1.01e6);
    assert_relative_eq!(eval("1.5uF * 2"), 3e-6);
    assert_relative_eq!(eval(".5e1"), 5.0);
    assert_eq!(eval("max(1,2)"), 2.0);
}

#[test]
fn constants_and_builtins() {
    assert_relative_eq!(eval("pi"), std::f64::consts::PI);
    assert_relative_eq!(eval("exp(1)"), std::f64::consts::E);
    assert_relative_eq!(eval("sin(pi/2)"), 1.0);
    assert_relative_eq!(eval("atan2(1, 1)"), std::f64::consts::FRAC_PI_4);
    assert_relative_eq!(eval("hypot(3, 4)"), 5.0);
    assert_eq!(eval("ABS(-3)"), 3.0);
    assert_eq!(eval("floor(2.7) + ceil(2.2)"), 5.0);
}

#[test]
fn library_functions() {
    assert_eq!(eval("min(3, 1, 2)"), 1.0);
    assert_eq!(eval("max(3, 1, 2)"), 3.0);
    assert_eq!(eval("limit(5, 0, 2)"), 2.0);
    assert_eq!(eval("if(0, 1, 2)"), 2.0);
    assert_eq!(eval("sgn(-4) + sign(0)"), -1.0);
    assert_eq!(eval("int(-2.7)"), -2.0);
    assert_eq!(eval("nint(2.5)"), 2.0);
    assert_eq!(eval("u(1) + u(-1) + uramp(-3) + uramp(2)"), 3.0);
    assert_eq!(eval("pwr(-2, 2)"), -4.0);
    assert_relative_eq!(eval("db(100)"), 40.0);
    assert_relative_eq!(eval("log10(1000)"), 3.0);
    assert_relative_eq!(eval("ln(e)"), 1.0);
    assert_eq!(eval("poly(1, 2, 1, 3)"), 7.0);
    assert_eq!(eval("poly(2, 1, 2, 0, 1, 1)"), 3.0);
}

#[test]
fn sqrt_by_dialect() {
    let sqrt = |dialect| Scope::new(dialect).evaluate("sqrt(-4)").unwrap();
    assert_relative_eq!(sqrt(Dialect::SmartSpice), 2.0);
    assert_relative_eq!(sqrt(Dialect::HSpice), -2.0);
    assert_eq!(sqrt(Dialect::LtSpice), 0.0);
    assert!(sqrt(Dialect::Spice3f5).is_nan());
}

#[test]
fn power_operators_follow_dialect() {
    let scope = Scope::new(Dialect::HSpice);
    assert_eq!(scope.evaluate("2 ** 2.5").unwrap(), 4.0);
    assert_eq!(scope.evaluate("2 ^ 2.5").unwrap(), 4.0);
    assert_eq!(scope.evaluate("pow(-2, 3)").unwrap(), -8.0);
}

#[test]
fn table_lookup() {
    assert_eq!(eval("table(1, 1,10, 2,20, 3,30)"), 10.0);
    assert_relative_eq!(eval("table(2.5, 1,10, 2,20, 3,30)"), 25.0);
    assert_eq!(eval("table(9, 3,30, 1,10, 2,20)"), 30.0);
    assert_eq!(eval("2 * table(0, 1,10, 2,20)"), 20.0);
    assert!(matches!(
        Scope::new(Dialect::default()).evaluate("table(1, 1,10, 2)"),
        Err(EvalError::Function { .. })
    ));
}

#[test]
fn raw_functions() {
    let mut scope = Scope::new(Dialect::default());
    scope.set_parameter("w", 2.0).unwrap();
    assert_eq!(scope.evaluate("def(w)").unwrap(), 1.0);
    assert_eq!(scope.evaluate("def(l)").unwrap(), 0.0);
    assert_eq!(scope.evaluate("lazy(w * 3) + 1").unwrap(), 7.0);

    scope.define_function(Function::raw("@", Arity::Fixed(2), |args, _| {
        Ok(match (args[0].as_str(), args[1].as_str()) {
            ("m1", "gm") => 1e-3,
            _ => 0.0,
        })
    }));
    assert_eq!(scope.evaluate("@m1[gm] * 1k").unwrap(), 1.0);

    scope.define_function(Function::raw("v", Arity::AtLeast(1), |args, ctx| {
        let sim = ctx
            .simulation
            .and_then(|s| s.downcast_ref::<Vec<(&str, f64)>>())
            .ok_or_else(|| EvalError::function("v", "no simulation"))?;
        Ok(sim
            .iter()
            .find(|(node, _)| *node == args[0])
            .map(|(_, v)| *v)
            .unwrap_or(0.0))
    }));
    let sim: Vec<(&str, f64)> = vec![("out", 0.7)];
    assert_eq!(scope.evaluate_with("v(out) * 2", Some(&sim)).unwrap(), 1.4);
    assert!(scope.evaluate("v(out)").is_err());
}

#[test]
fn custom_functions() {
    let mut scope = Scope::new(Dialect::default());
    scope.define_function(Function::evaluated("twice", Arity::Fixed(1), |args, _| {
        Ok(2.0 * args[0])
    }));
    scope.define_function(Function::evaluated("answer", Arity::Fixed(0), |_, _| Ok(42.0)));
    scope.define_function(
        Function::evaluated("avg", Arity::Fixed(2), |args, _| Ok((args[0] + args[1]) / 2.0))
            .infix(),
    );
    assert_eq!(scope.evaluate("twice(3) + 1").unwrap(), 7.0);
    assert_eq!(scope.evaluate("answer()").unwrap(), 42.0);
    assert_eq!(scope.evaluate("2 avg 4 * 2").unwrap(), 6.0);

    // Host functions override the fixed built-ins.
    scope.define_function(Function::evaluated("sin", Arity::Fixed(1), |_, _| Ok(-1.0)));
    assert_eq!(scope.evaluate("sin(0)").unwrap(), -1.0);

    let twice = scope.function("TWICE").unwrap();
    let ctx = CallContext {
        scope: &scope,
        simulation: None,
    };
    assert_eq!(twice.call(Arguments::Values(&[5.0]), &ctx).unwrap(), 10.0);
    assert!(twice.derivative(&[5.0], &ctx).is_none());
    let pow = scope.function("pow").unwrap();
    let d = pow.derivative(&[2.0, 3.0], &ctx).unwrap().unwrap();
    assert_relative_eq!(d[0], 12.0);
}

#[test]
fn errors() {
    let scope = Scope::new(Dialect::default());
    let err = |text| scope.evaluate(text).unwrap_err();

    assert_eq!(err(""), EvalError::Empty);
    assert_eq!(err("   "), EvalError::Empty);
    assert!(matches!(err("x + 1"), EvalError::UnknownParameter { name, .. } if name == "x"));
    assert!(matches!(err("foo(1)"), EvalError::UnknownFunction { name, .. } if name == "foo"));
    assert!(matches!(err("sin(1, 2)"), EvalError::Arity { found: 2, .. }));
    assert!(matches!(err("limit(1)"), EvalError::Arity { found: 1, .. }));
    assert!(matches!(err("(1 + 2"), EvalError::UnbalancedParentheses { .. }));
    assert!(matches!(err("1 + 2)"), EvalError::UnbalancedParentheses { .. }));
    assert!(matches!(err("1 ? 2"), EvalError::UnmatchedConditional { .. }));
    assert!(matches!(err("1 : 2"), EvalError::UnmatchedConditional { .. }));
    assert!(matches!(err("1 2"), EvalError::UnexpectedText { offset: 2, .. }));
    assert!(matches!(err("1 + #"), EvalError::UnexpectedText { .. }));
    assert!(matches!(err("1 +"), EvalError::StackUnderflow { .. }));
    assert!(matches!(err("{1 + 2}"), EvalError::Bracketed { .. }));
    assert!(matches!(err("mod(1, 0)"), EvalError::Function { .. }));
}

#[test]
fn child_scopes_shadow_without_writing_through() {
    let mut root = Scope::new(Dialect::default());
    root.set_parameter("a", 1.0).unwrap();
    root.set_parameter("b", 2.0).unwrap();
    {
        let mut child = root.child();
        assert_eq!(child.evaluate("a + b").unwrap(), 3.0);
        child.set_parameter("A", 10.0).unwrap();
        assert_eq!(child.evaluate("a + b").unwrap(), 12.0);
        assert_eq!(child.parameter("a"), Some(10.0));
        assert!(child.is_defined("B"));

        let grandchild = child.child();
        assert_eq!(grandchild.evaluate("a * b").unwrap(), 20.0);
        assert_eq!(grandchild.evaluate("sqrt(16)").unwrap(), 4.0);
    }
    assert_eq!(root.parameter("a"), Some(1.0));
    assert_eq!(root.evaluate("a + b").unwrap(), 3.0);
}

#[test]
fn dynamic_expression_fires_once_per_set() {
    let mut scope = Scope::new(Dialect::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    scope.add_dynamic_expression("xyz+1", ["xyz"], move |_, value| {
        sink.lock().unwrap().push(value);
        Ok(())
    });
    assert!(seen.lock().unwrap().is_empty());

    scope.set_parameter("xyz", 13.0).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![14.0]);
    scope.set_parameter("xyz", 14.0).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![14.0, 15.0]);

    scope.set_parameter("other", 1.0).unwrap();
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn dynamic_callbacks_can_set_parameters() {
    let mut scope = Scope::new(Dialect::default());
    scope.set_parameter("w", 1.0).unwrap();
    assert_eq!(scope.set_parameter_expression("area", "w * 2").unwrap(), 2.0);
    assert_eq!(scope.set_parameter_expression("cap", "area * 3").unwrap(), 6.0);

    scope.set_parameter("w", 5.0).unwrap();
    assert_eq!(scope.parameter("area"), Some(10.0));
    assert_eq!(scope.parameter("cap"), Some(30.0));
}

#[test]
fn self_referencing_refresh_terminates() {
    let mut scope = Scope::new(Dialect::default());
    scope.set_parameter("n", 1.0).unwrap();
    scope.set_parameter_expression("n", "n + 1").unwrap();
    assert_eq!(scope.parameter("n"), Some(2.0));

    scope.set_parameter("n", 10.0).unwrap();
    assert_eq!(scope.parameter("n"), Some(11.0));
}

#[test]
fn free_names_dry_run() {
    let scope = Scope::new(Dialect::default());
    let names = scope
        .free_names("W * max(L, 2) + foo(x) + table(vgs, 0,0, 1,idsat) + @m1[gm]")
        .unwrap();
    assert_eq!(
        names.parameters.into_iter().collect::<Vec<_>>(),
        vec!["idsat", "l", "vgs", "w", "x"]
    );
    assert!(names.functions.contains("max"));
    assert!(names.functions.contains("foo"));
    assert!(names.functions.contains("table"));
    assert!(names.functions.contains("@"));

    let names = crate::free_names("sin(a) + pi").unwrap();
    assert!(names.functions.contains("sin"));
    assert!(names.parameters.contains("a"));
    assert!(crate::free_names("a +").is_err());

    let names = crate::free_names("a**b + c^2").unwrap();
    assert_eq!(
        names.parameters.into_iter().collect::<Vec<_>>(),
        vec!["a", "b", "c"]
    );
    assert!(names.functions.contains("**"));
}

#[test]
fn seeded_scopes_repeat_random_draws() {
    let draw = |seed| {
        let scope = Scope::new(Dialect::default());
        scope.seed(seed);
        let child = scope.child();
        (0..4)
            .map(|_| child.evaluate("agauss(1, 0.1, 3) + unif(1, 0.5)").unwrap())
            .collect::<Vec<_>>()
    };
    assert_eq!(draw(3), draw(3));
    assert_ne!(draw(3), draw(4));

    let scope = Scope::new(Dialect::default());
    for _ in 0..100 {
        let x = scope.evaluate("aunif(5, 1)").unwrap();
        assert!((4.0..6.0).contains(&x));
        let r = scope.evaluate("random()").unwrap();
        assert!((0.0..1.0).contains(&r));
    }
}

#[test]
fn dialects_parse() {
    assert_eq!("HSPICE".parse::<Dialect>().unwrap(), Dialect::HSpice);
    assert_eq!("lt".parse::<Dialect>().unwrap(), Dialect::LtSpice);
    assert_eq!(Dialect::SmartSpice.to_string(), "smartspice");
    assert!("ngspice-ish".parse::<Dialect>().is_err());
    assert_eq!(Dialect::default(), Dialect::Spice3f5);
}

#[test]
fn polynomial_expression_evaluates_like_poly() {
    let p = Polynomial::new(2, vec![1.0, 2.0, 3.0, 4.0]);
    let mut scope = Scope::new(Dialect::default());
    scope.set_parameter("a", 1.5).unwrap();
    scope.set_parameter("b", -2.0).unwrap();
    let text = p.to_expression(&["a", "b"]);
    assert_relative_eq!(scope.evaluate(&text).unwrap(), p.eval(&[1.5, -2.0]));
    assert_relative_eq!(
        scope.evaluate("poly(2, a, b, 1, 2, 3, 4)").unwrap(),
        p.eval(&[1.5, -2.0])
    );
}
