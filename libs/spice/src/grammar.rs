//! The SPICE rule catalog.
//!
//! Rule order matters: when two rules match the same length, the rule
//! declared first wins, so keywords precede the generic `.word` rule and
//! values precede identifiers.

use lazy_static::lazy_static;
use regex::Regex;
use rulelex::{
    DynamicMatch, DynamicRule, Emit, Grammar, GrammarBuilder, GrammarError, LexerState,
    StaticRule, Window,
};
use serde::{Deserialize, Serialize};

/// The kinds of SPICE tokens.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Blanks between tokens.
    Whitespace,
    /// A line break.
    Newline,
    /// A line continuation marker together with its line break.
    Continuation,
    /// A single-line comment.
    Comment,
    /// The title line.
    Title,
    /// A dot directive such as `.param` or `.subckt`.
    Dot,
    /// `.end`
    End,
    /// `.ends`
    Ends,
    /// `.endl`
    Endl,
    /// `.if`
    If,
    /// `.elseif`
    ElseIf,
    /// `.else`
    Else,
    /// `.endif`
    EndIf,
    /// A numeric literal, possibly with a suffix and unit.
    Value,
    /// A numeric literal followed by `%`.
    Percent,
    /// A plain name.
    Word,
    /// A name containing hierarchy separators or other punctuation.
    Identifier,
    /// A device property reference such as `@m1[gm]`.
    Reference,
    /// A double-quoted string.
    DoubleQuoted,
    /// A single-quoted expression.
    SingleQuoted,
    /// A `{...}` expression.
    ExpressionBracket,
    /// The parenthesized condition of `.if` or `.elseif`.
    BooleanExpression,
    /// `(`, `)`, `[` or `]`.
    Delimiter,
    /// `,`
    Comma,
    /// `=`
    Equal,
    /// An arithmetic or logical operator.
    Operator,
    /// A bus range after a name, such as `<0:3>`.
    BusSuffix,
    /// A bus repetition prefix, such as `<*3>`.
    BusPrefix,
    /// `#com`
    BlockCommentStart,
    /// `#endcom`
    BlockCommentEnd,
    /// Text inside a block comment.
    BlockCommentContent,
    /// The end of input.
    Eof,
}

/// Options selecting the rules of a SPICE grammar.
///
/// Equal options produce equal grammars, which makes the options usable as
/// a [`GrammarCache`](rulelex::GrammarCache) key.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiceLexerOptions {
    /// Treat the first line as a title.
    pub has_title: bool,
    /// Emit comments as tokens instead of skipping them.
    pub keep_comments: bool,
    /// Recognize HSPICE `$` inline comments.
    pub hspice_comments: bool,
    /// Recognize PSpice `;` inline comments.
    pub pspice_comments: bool,
    /// Recognize `#com` ... `#endcom` block comments.
    pub block_comments: bool,
    /// Recognize bus suffixes (`a<0:3>`) and prefixes (`<*2>`).
    pub enable_bus_syntax: bool,
    /// The candidate window policy.
    pub window: Window,
}

impl Default for SpiceLexerOptions {
    fn default() -> Self {
        Self {
            has_title: false,
            keep_comments: false,
            hspice_comments: true,
            pspice_comments: true,
            block_comments: true,
            enable_bus_syntax: false,
            window: Window::Logical,
        }
    }
}

lazy_static! {
    /// Matches a continuation marker with its line break and surrounding
    /// blanks.
    pub static ref CONTINUATION_REGEX: Regex =
        Regex::new(r"[ \t]*\\[ \t]*(\r\n|\n|\r)[ \t]*|[ \t]*(\r\n|\n|\r)[ \t]*\+[ \t]*").unwrap();
}

/// Replaces every continuation marker in `text` by a single space.
pub fn strip_continuations(text: &str) -> String {
    CONTINUATION_REGEX.replace_all(text, " ").into_owned()
}

/// Scans a balanced `open`/`close` group at the start of `window`.
///
/// The lexeme keeps the outer delimiters, with continuation markers
/// replaced by spaces.
fn balanced(window: &str, open: char, close: char) -> Result<Option<DynamicMatch>, String> {
    let mut depth = 0usize;
    for (i, c) in window.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                let len = i + c.len_utf8();
                return Ok(Some(DynamicMatch {
                    len,
                    lexeme: strip_continuations(&window[..len]),
                }));
            }
        }
    }
    Err(format!("unbalanced `{open}`"))
}

fn comment_emit(keep: bool) -> impl Fn(&mut LexerState<TokenKind>, &str) -> Emit + Send + Sync {
    move |_, _| if keep { Emit::Token } else { Emit::Skip }
}

/// Builds the SPICE grammar for `options`.
pub fn grammar(options: &SpiceLexerOptions) -> Result<Grammar<TokenKind>, GrammarError> {
    use TokenKind::*;

    let keep = options.keep_comments;
    let mut b = GrammarBuilder::new(Eof);
    b.pattern("NEWLINE", r"\r\n|\n|\r")
        .pattern("DIGIT", "[0-9]")
        .pattern("MANTISSA", r"<DIGIT>+(\.<DIGIT>*)?|\.<DIGIT>+")
        .pattern("EXPONENT", "[eE][+-]?<DIGIT>+")
        .pattern("SUFFIX", "meg|mil|[tgkmunpf]")
        .pattern("VALUE", "[+-]?(<MANTISSA>)(<EXPONENT>)?(<SUFFIX>)?[a-z]*")
        .pattern("NAME", "[a-z_][a-z0-9_]*");

    // Blanks and continuations separate tokens wherever they appear.
    b.rule(StaticRule::new("whitespace", Whitespace, r"[ \t]+").top().skip())
        .rule(
            StaticRule::new("next_line_continuation", Continuation, r"(<NEWLINE>)[ \t]*\+")
                .top()
                .skip(),
        )
        .rule(
            StaticRule::new(
                "current_line_continuation",
                Continuation,
                r"\\[ \t]*(<NEWLINE>)",
            )
            .top()
            .skip(),
        );

    b.rule(
        DynamicRule::new("expression_bracket", ExpressionBracket, r"\{", |window, _| {
            balanced(window, '{', '}')
        })
        .when(|s| !s.in_comment_block),
    )
    .rule(
        DynamicRule::new("boolean_expression", BooleanExpression, r"\(", |window, _| {
            balanced(window, '(', ')')
        })
        .when(|s| !s.in_comment_block && s.previous_is(&[If, ElseIf])),
    );

    if options.has_title {
        b.rule(
            StaticRule::new("title", Title, r"[^\r\n]+")
                .top()
                .when(|s| s.line == 1 && s.previous.is_none()),
        );
    }

    for (name, kind, pattern) in [
        ("end", End, r"\.end\b"),
        ("ends", Ends, r"\.ends\b"),
        ("endl", Endl, r"\.endl\b"),
        ("if", If, r"\.if\b"),
        ("elseif", ElseIf, r"\.elseif\b"),
        ("else", Else, r"\.else\b"),
        ("endif", EndIf, r"\.endif\b"),
        ("dot", Dot, r"\.<NAME>"),
    ] {
        b.rule(StaticRule::new(name, kind, pattern).case_insensitive());
    }

    b.rule(StaticRule::new("value", Value, "<VALUE>").case_insensitive())
        .rule(StaticRule::new("percent", Percent, "<VALUE>%").case_insensitive());

    b.rule(
        StaticRule::new("line_comment", Comment, r"\*[^\r\n]*")
            .when(|s| s.start_of_line)
            .on_match(comment_emit(keep)),
    );
    if options.hspice_comments {
        // `$` only starts a comment after a blank or at the start of a line,
        // so names such as `a$b` stay intact.
        b.rule(
            StaticRule::new("hspice_comment", Comment, r"[ \t]+\$[^\r\n]*")
                .top()
                .on_match(comment_emit(keep)),
        )
        .rule(
            StaticRule::new("hspice_line_comment", Comment, r"\$[^\r\n]*")
                .when(|s| s.start_of_line)
                .on_match(comment_emit(keep)),
        );
    }
    if options.pspice_comments {
        b.rule(StaticRule::new("pspice_comment", Comment, r";[^\r\n]*").on_match(comment_emit(keep)));
    }
    if options.block_comments {
        b.rule(
            StaticRule::new("block_comment_start", BlockCommentStart, r"#com\b")
                .case_insensitive()
                .when(|s| !s.in_comment_block)
                .on_match(move |s, _| {
                    s.in_comment_block = true;
                    if keep {
                        Emit::Token
                    } else {
                        Emit::Skip
                    }
                }),
        )
        .rule(
            StaticRule::new("block_comment_end", BlockCommentEnd, r"#endcom\b")
                .case_insensitive()
                .top()
                .when(|s| s.in_comment_block)
                .on_match(move |s, _| {
                    s.in_comment_block = false;
                    if keep {
                        Emit::Token
                    } else {
                        Emit::Skip
                    }
                }),
        )
        .rule(
            StaticRule::new("block_comment_content", BlockCommentContent, r"[^\r\n#]+|#")
                .top()
                .when(|s| s.in_comment_block)
                .on_match(comment_emit(keep)),
        );
    }

    b.rule(StaticRule::new(
        "double_quoted",
        DoubleQuoted,
        r#""([^"\\\r\n]|\\.)*""#,
    ))
    .rule(StaticRule::new(
        "single_quoted",
        SingleQuoted,
        r"'([^'\\\r\n]|\\[ \t]*(<NEWLINE>)|(<NEWLINE>)[ \t]*\+)*'",
    ));

    b.rule(
        StaticRule::new(
            "reference",
            Reference,
            r"@<NAME>([.:]<NAME>)*(\[<NAME>\])?",
        )
        .case_insensitive(),
    )
    .rule(StaticRule::new("word", Word, "<NAME>").case_insensitive())
    .rule(StaticRule::new(
        "identifier",
        Identifier,
        r"[A-Za-z0-9_][A-Za-z0-9_.:!#$\[\]/]*",
    ));

    b.rule(StaticRule::new("delimiter", Delimiter, r"[()\[\]]"))
        .rule(StaticRule::new("comma", Comma, ","))
        .rule(StaticRule::new("equal", Equal, "="))
        .rule(StaticRule::new("operator", Operator, r"[*/^+\-<>!=&|?:%]+"));

    if options.enable_bus_syntax {
        b.rule(
            StaticRule::new(
                "bus_suffix",
                BusSuffix,
                r"<[0-9]+(:[0-9]+)?(,[0-9]+(:[0-9]+)?)*>",
            )
            .when(|s| s.previous_is(&[Word, Identifier, BusSuffix])),
        )
        .rule(StaticRule::new("bus_prefix", BusPrefix, r"<\*[0-9]+>"));
    }

    b.rule(
        StaticRule::new("newline", Newline, "<NEWLINE>")
            .on_match(|s, _| if s.in_comment_block { Emit::Skip } else { Emit::Token }),
    );

    b.build()
}
