use approx::assert_relative_eq;
use spice::value::{expression_text, token_value};
use spice::{SpiceGrammarCache, SpiceLexer, SpiceLexerOptions, Token, TokenKind};
use spice_expr::{Dialect, Scope};
use test_log::test;

const OPAMP: &str = include_str!("data/opamp.sp");

fn statements(tokens: &[Token]) -> Vec<&[Token]> {
    tokens
        .split(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Applies `.param` statements and conditionals to `scope`.
fn elaborate(tokens: &[Token], scope: &mut Scope<'_>) {
    let mut active = vec![true];
    for statement in statements(tokens) {
        let head = &statement[0];
        match head.kind {
            TokenKind::If => {
                let parent = *active.last().unwrap();
                let cond = token_value(&statement[1], scope).unwrap() != 0.0;
                active.push(parent && cond);
            }
            TokenKind::Else => {
                let cond = active.pop().unwrap();
                let parent = *active.last().unwrap();
                active.push(parent && !cond);
            }
            TokenKind::EndIf => {
                active.pop();
            }
            TokenKind::Dot
                if *active.last().unwrap() && head.lexeme.eq_ignore_ascii_case(".param") =>
            {
                for assignment in statement[1..].chunks(3) {
                    let [name, eq, value] = assignment else {
                        panic!("malformed assignment at line {}", head.line);
                    };
                    assert_eq!(eq.kind, TokenKind::Equal);
                    scope
                        .set_parameter_expression(&name.lexeme, &expression_text(value))
                        .unwrap();
                }
            }
            _ => (),
        }
    }
}

fn lexer() -> SpiceLexer {
    SpiceLexer::new(SpiceLexerOptions {
        has_title: true,
        ..Default::default()
    })
    .unwrap()
    .with_file("opamp.sp")
}

#[test]
fn tokenizes_opamp_netlist() {
    let tokens = lexer().tokenize(OPAMP).unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Title);
    assert_eq!(tokens[0].lexeme, "Two-stage op amp");
    assert!(tokens.iter().all(|t| t.file.as_deref() == Some("opamp.sp")));
    assert!(!tokens
        .iter()
        .any(|t| t.lexeme.contains("ignored") || t.lexeme.contains("compensation")));

    let devices: Vec<_> = statements(&tokens)
        .into_iter()
        .filter(|s| s[0].kind == TokenKind::Word)
        .map(|s| s[0].lexeme.to_string())
        .collect();
    assert_eq!(devices, vec!["m1", "m2", "m3", "m4", "itail", "cc"]);

    let subckt = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Dot && t.lexeme == ".subckt")
        .unwrap();
    assert_eq!(subckt.line, 13);
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
}

#[test]
fn evaluates_opamp_parameters() {
    let tokens = lexer().tokenize(OPAMP).unwrap();
    let mut scope = Scope::new(Dialect::HSpice);
    elaborate(&tokens, &mut scope);

    let p = |name: &str| scope.parameter(name).unwrap();
    assert_relative_eq!(p("vdd"), 1.8);
    assert_relative_eq!(p("wn"), 2e-6);
    assert_relative_eq!(p("ln"), 180e-9);
    assert_relative_eq!(p("wp"), 4e-6);
    assert_relative_eq!(p("ratio"), 2.0);
    assert_relative_eq!(p("gain_db"), 40.0);
    assert_relative_eq!(p("bias"), 0.9);

    let cc = tokens
        .iter()
        .find(|t| t.kind == TokenKind::ExpressionBracket && t.lexeme.contains("ratio"))
        .unwrap();
    assert_relative_eq!(token_value(cc, &scope).unwrap(), 2e-12);
}

#[test]
fn dependent_parameters_follow_updates() {
    let tokens = lexer().tokenize(OPAMP).unwrap();
    let mut scope = Scope::new(Dialect::default());
    elaborate(&tokens, &mut scope);

    scope.set_parameter("wn", 1e-6).unwrap();
    assert_relative_eq!(scope.parameter("wp").unwrap(), 2e-6);
    assert_relative_eq!(scope.parameter("ratio").unwrap(), 2.0);

    // Subcircuit instances see the parent's values but write locally.
    let mut instance = scope.child();
    instance.set_parameter("ln", 1e-6).unwrap();
    assert_relative_eq!(instance.evaluate("wn / ln").unwrap(), 1.0);
    assert_relative_eq!(scope.parameter("ln").unwrap(), 180e-9);
}

#[test]
fn shared_cache_across_threads() {
    let cache = SpiceGrammarCache::new();
    let counts: Vec<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                s.spawn(move || {
                    let options = SpiceLexerOptions {
                        has_title: true,
                        ..Default::default()
                    };
                    SpiceLexer::with_cache(&cache, options)
                        .unwrap()
                        .tokenize(OPAMP)
                        .unwrap()
                        .len()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(counts.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(cache.len(), 1);
}
