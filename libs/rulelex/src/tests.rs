use std::sync::Arc;

use test_log::test;

use crate::*;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
enum K {
    Space,
    Newline,
    Continuation,
    Keyword,
    Word,
    Number,
    Bracket,
    Comment,
    Eof,
}

fn bracket_matcher(window: &str, _state: &LexerState<K>) -> Result<Option<DynamicMatch>, String> {
    let mut depth = 0usize;
    for (i, c) in window.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(Some(DynamicMatch {
                        len: i + 1,
                        lexeme: window[..=i].to_string(),
                    }));
                }
            }
            _ => (),
        }
    }
    Err("unbalanced `[`".to_string())
}

fn grammar() -> Grammar<K> {
    let mut b = GrammarBuilder::new(K::Eof);
    b.pattern("DIGIT", "[0-9]")
        .pattern("NUMBER", "<DIGIT>+(\\.<DIGIT>*)?")
        .rule(StaticRule::new("space", K::Space, "[ \\t]+").top().skip())
        .rule(
            StaticRule::new("continuation", K::Continuation, "(\\r\\n|\\n)[ \\t]*\\+")
                .top()
                .skip(),
        )
        .rule(DynamicRule::new("bracket", K::Bracket, "\\[", bracket_matcher))
        .rule(StaticRule::new("keyword", K::Keyword, "if").case_insensitive())
        .rule(StaticRule::new("word", K::Word, "[a-zA-Z_]+"))
        .rule(StaticRule::new("number", K::Number, "<NUMBER>"))
        .rule(
            StaticRule::new("comment", K::Comment, "\\*[^\\n]*")
                .when(|s| s.start_of_line)
                .skip(),
        )
        .rule(StaticRule::new("newline", K::Newline, "\\r\\n|\\n"));
    b.build().unwrap()
}

fn lexer(window: Window, keep_suppressed: bool) -> Lexer<K> {
    Lexer::new(
        Arc::new(grammar()),
        LexerOptions {
            window,
            continuation: Continuation::spice(),
            keep_suppressed,
        },
    )
}

fn kinds(tokens: &[Token<K>]) -> Vec<K> {
    tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn longest_match_wins() {
    let toks = lexer(Window::Logical, false).tokenize("iffy if IF").unwrap();
    assert_eq!(
        kinds(&toks),
        vec![K::Word, K::Keyword, K::Keyword, K::Eof]
    );
    assert_eq!(toks[0].lexeme, "iffy");
}

#[test]
fn top_rules_beat_longer_matches() {
    let mut b = GrammarBuilder::new(K::Eof);
    b.rule(StaticRule::new("word", K::Word, "[a-z]+"))
        .rule(StaticRule::new("a", K::Keyword, "a").top());
    let lexer = Lexer::new(Arc::new(b.build().unwrap()), LexerOptions::default());
    let toks = lexer.tokenize("abc").unwrap();
    assert_eq!(kinds(&toks), vec![K::Keyword, K::Word, K::Eof]);
    assert_eq!(toks[1].lexeme, "bc");
}

#[test]
fn internal_patterns_are_expanded() {
    let toks = lexer(Window::Logical, false).tokenize("12.5 7").unwrap();
    assert_eq!(kinds(&toks), vec![K::Number, K::Number, K::Eof]);
    assert_eq!(toks[0].lexeme, "12.5");
}

#[test]
fn unknown_internal_pattern_is_rejected() {
    let mut b = GrammarBuilder::new(K::Eof);
    b.rule(StaticRule::new("word", K::Word, "<LETTER>+"));
    assert!(matches!(
        b.build(),
        Err(GrammarError::UnknownPattern { pattern, .. }) if pattern == "LETTER"
    ));
}

#[test]
fn raw_spans_reconstruct_input() {
    let input = "* comment\nif abc [x [y]]\n  + 42\nword\n";
    let toks = lexer(Window::Logical, true).tokenize(input).unwrap();
    let rebuilt: String = toks.iter().map(|t| t.raw(input)).collect();
    assert_eq!(rebuilt, input);
    assert!(toks.iter().any(|t| t.suppressed && t.kind == K::Comment));
}

#[test]
fn continuation_requires_logical_window() {
    let input = "abc\n+ def\n";
    let toks = lexer(Window::Logical, false).tokenize(input).unwrap();
    assert_eq!(kinds(&toks), vec![K::Word, K::Word, K::Newline, K::Eof]);
    assert_eq!((toks[1].line, toks[1].column), (2, 3));

    let err = lexer(Window::Line, false).tokenize(input).unwrap_err();
    assert_eq!((err.line, err.column), (2, 1));
}

#[test]
fn errors_report_position() {
    let err = lexer(Window::Logical, false)
        .tokenize("abc\n  12 ?")
        .unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 6);
    assert!(err.message.contains('?'));
}

#[test]
fn unbalanced_dynamic_match_reports_opening_position() {
    let err = lexer(Window::Logical, false)
        .tokenize("abc\n x [1 [2]\n")
        .unwrap_err();
    assert_eq!((err.line, err.column), (2, 4));
    assert!(err.message.contains("unbalanced"));
}

#[test]
fn failing_dynamic_rule_yields_to_top_rules() {
    let mut b = GrammarBuilder::new(K::Eof);
    b.rule(DynamicRule::new("bracket", K::Bracket, "\\[", bracket_matcher))
        .rule(StaticRule::new("word", K::Word, "\\[[a-z ]+"));
    let lexer = Lexer::new(Arc::new(b.build().unwrap()), LexerOptions::default());
    let err = lexer.tokenize("[ab cd").unwrap_err();
    assert!(err.message.contains("unbalanced"));

    let mut b = GrammarBuilder::new(K::Eof);
    b.rule(DynamicRule::new("bracket", K::Bracket, "\\[", bracket_matcher))
        .rule(StaticRule::new("tag", K::Keyword, "\\[[a-z]+").top());
    let lexer = Lexer::new(Arc::new(b.build().unwrap()), LexerOptions::default());
    let toks = lexer.tokenize("[ab").unwrap();
    assert_eq!(kinds(&toks), vec![K::Keyword, K::Eof]);
    assert_eq!(toks[0].lexeme, "[ab");
}

#[test]
fn match_actions_see_candidate_flags() {
    let mut b = GrammarBuilder::new(K::Eof);
    b.rule(StaticRule::new("space", K::Space, "[ \\t]+").top().skip())
        .rule(StaticRule::new("newline", K::Newline, "\\n"))
        .rule(
            StaticRule::new("word", K::Word, "[a-z]+").on_match(|s, _| {
                if s.full_match && s.line_break_follows {
                    Emit::Token
                } else {
                    Emit::Skip
                }
            }),
        )
        .rule(
            StaticRule::new("number", K::Number, "[0-9]+")
                .when(|s| !s.full_match && !s.line_break_follows),
        );
    let lexer = Lexer::new(Arc::new(b.build().unwrap()), LexerOptions::default());
    let toks = lexer.tokenize("ab cd\nef 12\n34\n").unwrap();
    assert_eq!(
        kinds(&toks),
        vec![K::Word, K::Newline, K::Number, K::Newline, K::Number, K::Newline, K::Eof]
    );
    assert_eq!(toks[0].lexeme, "cd");
}

#[test]
fn full_window_spans_lines() {
    let toks = lexer(Window::Full, false).tokenize("[a\nb]").unwrap();
    assert_eq!(kinds(&toks), vec![K::Bracket, K::Eof]);
    assert_eq!(toks[0].lexeme, "[a\nb]");
    assert_eq!((toks[1].line, toks[1].column), (2, 3));
}

#[test]
fn start_of_line_predicate() {
    let err = lexer(Window::Logical, false).tokenize("abc *x").unwrap_err();
    assert_eq!(err.column, 5);
    let toks = lexer(Window::Logical, false)
        .tokenize("*x\nabc")
        .unwrap();
    assert_eq!(kinds(&toks), vec![K::Newline, K::Word, K::Eof]);
}

#[test]
fn peek_does_not_advance() {
    let lexer = lexer(Window::Logical, false);
    let mut tokens = lexer.tokens("abc 1");
    let a = tokens.peek().unwrap().unwrap();
    let b = tokens.peek().unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(tokens.next().unwrap().unwrap(), a);
    assert_eq!(tokens.next().unwrap().unwrap().kind, K::Number);
    assert_eq!(tokens.state().previous, Some(K::Number));
}

#[test]
fn tokens_carry_file_tags() {
    let lexer = lexer(Window::Logical, false).with_file("top.sp");
    let toks = lexer.tokenize("abc").unwrap();
    assert!(toks.iter().all(|t| t.file.as_deref() == Some("top.sp")));
    assert_eq!(toks[0].to_string(), "top.sp:1:1 Word \"abc\"");
}

#[test]
fn logical_lines_splice_and_peek() {
    let text = "r1 a b\n+ 10k\nc1 a \\\n b 1p\n\nv1 a 0";
    let mut lines = LogicalLines::new(text, Continuation::spice());
    let peeked = lines.peek().unwrap();
    assert_eq!(lines.peek().unwrap(), peeked);
    assert_eq!(lines.position(), 0);

    let first = lines.next().unwrap();
    assert_eq!(first, peeked);
    assert_eq!(first.text, "r1 a b  10k");
    assert_eq!(first.physical_lines, 2);

    let second = lines.next().unwrap();
    assert_eq!(second.text, "c1 a   b 1p");
    assert_eq!(second.line, 3);

    let blank = lines.next().unwrap();
    assert_eq!(blank.text, "");
    assert_eq!(blank.line, 5);

    let last = lines.next().unwrap();
    assert_eq!(last.text, "v1 a 0");
    assert_eq!(last.line, 6);
    assert!(lines.next().is_none());
}

#[test]
fn grammar_cache_builds_once() {
    let cache: GrammarCache<u8, K> = GrammarCache::new();
    let mut builds = 0;
    let a = cache
        .get_or_build(&1, |_| {
            builds += 1;
            Ok(grammar())
        })
        .unwrap();
    let b = cache
        .get_or_build(&1, |_| {
            builds += 1;
            Ok(grammar())
        })
        .unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(builds, 1);
    assert_eq!(cache.clone().len(), 1);
}

#[test]
fn grammar_cache_is_shared_across_threads() {
    let cache: GrammarCache<u8, K> = GrammarCache::new();
    let handles = (0..4)
        .map(|_| {
            let cache = cache.clone();
            std::thread::spawn(move || cache.get_or_build(&7, |_| Ok(grammar())).unwrap())
        })
        .collect::<Vec<_>>();
    let grammars = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect::<Vec<_>>();
    assert!(grammars.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(cache.len(), 1);
}
