//! Lexer rules.
//!
//! A rule is either a [`StaticRule`], matched by a regular expression, or a
//! [`DynamicRule`], whose match length is computed by a procedural scan once
//! a trigger prefix has matched. Rules are collected into a
//! [`Grammar`](crate::Grammar) by a [`GrammarBuilder`](crate::GrammarBuilder).

use std::fmt::Debug;
use std::sync::Arc;

use arcstr::ArcStr;

use crate::state::LexerState;

/// A predicate deciding whether a rule applies in the current lexer state.
pub type Predicate<K> = Arc<dyn Fn(&LexerState<K>) -> bool + Send + Sync>;

/// An action run on the winning match of a rule.
///
/// The action receives the lexer state and the matched text, may update
/// state flags, and decides whether the match is emitted as a token.
pub type Action<K> = Arc<dyn Fn(&mut LexerState<K>, &str) -> Emit + Send + Sync>;

/// A procedural matcher.
///
/// Receives the candidate window (starting at the current position) and the
/// lexer state. Returns `Ok(None)` if the rule does not match, and
/// `Err(message)` if the text is malformed in a way that must abort
/// tokenization.
pub type Matcher<K> =
    Arc<dyn Fn(&str, &LexerState<K>) -> Result<Option<DynamicMatch>, String> + Send + Sync>;

/// Whether a match produces a token.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Emit {
    /// Emit a token.
    #[default]
    Token,
    /// Consume the text silently.
    Skip,
}

/// The result of a successful procedural match.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DynamicMatch {
    /// The number of bytes of raw input consumed.
    pub len: usize,
    /// The text to use as the token's lexeme.
    pub lexeme: String,
}

/// A rule matched by a regular expression.
#[derive(Clone)]
pub struct StaticRule<K> {
    pub(crate) name: ArcStr,
    pub(crate) kind: K,
    pub(crate) pattern: String,
    pub(crate) case_insensitive: bool,
    pub(crate) top: bool,
    pub(crate) applies: Option<Predicate<K>>,
    pub(crate) action: Option<Action<K>>,
}

/// A rule whose match is computed by a procedural scan.
#[derive(Clone)]
pub struct DynamicRule<K> {
    pub(crate) name: ArcStr,
    pub(crate) kind: K,
    pub(crate) prefix: String,
    pub(crate) matcher: Matcher<K>,
    pub(crate) top: bool,
    pub(crate) applies: Option<Predicate<K>>,
    pub(crate) action: Option<Action<K>>,
}

/// A lexer rule.
#[derive(Clone)]
pub enum Rule<K> {
    /// A regex rule.
    Static(StaticRule<K>),
    /// A procedural rule.
    Dynamic(DynamicRule<K>),
}

impl<K> StaticRule<K> {
    /// Creates a new static rule.
    ///
    /// The pattern may reference the grammar's internal patterns as `<NAME>`.
    /// It is implicitly anchored at the start of the candidate window.
    pub fn new(name: impl Into<ArcStr>, kind: K, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            pattern: pattern.into(),
            case_insensitive: false,
            top: false,
            applies: None,
            action: None,
        }
    }

    /// Matches the pattern case-insensitively.
    pub fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Elevates this rule above length-based competition.
    pub fn top(mut self) -> Self {
        self.top = true;
        self
    }

    /// Only applies the rule when the predicate holds.
    pub fn when(mut self, applies: impl Fn(&LexerState<K>) -> bool + Send + Sync + 'static) -> Self {
        self.applies = Some(Arc::new(applies));
        self
    }

    /// Runs the given action on every winning match of this rule.
    pub fn on_match(
        mut self,
        action: impl Fn(&mut LexerState<K>, &str) -> Emit + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// Consumes matches of this rule without emitting tokens.
    pub fn skip(self) -> Self {
        self.on_match(|_, _| Emit::Skip)
    }

    /// The name of the rule.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }
}

impl<K> DynamicRule<K> {
    /// Creates a new dynamic rule.
    ///
    /// The matcher is only invoked once `prefix` matches at the start of the
    /// candidate window.
    pub fn new(
        name: impl Into<ArcStr>,
        kind: K,
        prefix: impl Into<String>,
        matcher: impl Fn(&str, &LexerState<K>) -> Result<Option<DynamicMatch>, String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            prefix: prefix.into(),
            matcher: Arc::new(matcher),
            top: false,
            applies: None,
            action: None,
        }
    }

    /// Elevates this rule above length-based competition.
    pub fn top(mut self) -> Self {
        self.top = true;
        self
    }

    /// Only applies the rule when the predicate holds.
    pub fn when(mut self, applies: impl Fn(&LexerState<K>) -> bool + Send + Sync + 'static) -> Self {
        self.applies = Some(Arc::new(applies));
        self
    }

    /// Runs the given action on every winning match of this rule.
    pub fn on_match(
        mut self,
        action: impl Fn(&mut LexerState<K>, &str) -> Emit + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(Arc::new(action));
        self
    }

    /// The name of the rule.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }
}

impl<K: Copy> Rule<K> {
    /// The name of the rule.
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Static(r) => &r.name,
            Self::Dynamic(r) => &r.name,
        }
    }

    /// The kind of token this rule produces.
    pub fn kind(&self) -> K {
        match self {
            Self::Static(r) => r.kind,
            Self::Dynamic(r) => r.kind,
        }
    }

    /// Whether this rule wins over non-top rules regardless of match length.
    pub fn is_top(&self) -> bool {
        match self {
            Self::Static(r) => r.top,
            Self::Dynamic(r) => r.top,
        }
    }

    pub(crate) fn applies(&self, state: &LexerState<K>) -> bool {
        let applies = match self {
            Self::Static(r) => r.applies.as_ref(),
            Self::Dynamic(r) => r.applies.as_ref(),
        };
        applies.map(|f| f(state)).unwrap_or(true)
    }

    pub(crate) fn decide(&self, state: &mut LexerState<K>, lexeme: &str) -> Emit {
        let action = match self {
            Self::Static(r) => r.action.as_ref(),
            Self::Dynamic(r) => r.action.as_ref(),
        };
        action.map(|f| f(state, lexeme)).unwrap_or_default()
    }
}

impl<K> From<StaticRule<K>> for Rule<K> {
    fn from(value: StaticRule<K>) -> Self {
        Self::Static(value)
    }
}

impl<K> From<DynamicRule<K>> for Rule<K> {
    fn from(value: DynamicRule<K>) -> Self {
        Self::Dynamic(value)
    }
}

impl<K: Debug> Debug for Rule<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(r) => f
                .debug_struct("StaticRule")
                .field("name", &r.name)
                .field("kind", &r.kind)
                .field("pattern", &r.pattern)
                .field("top", &r.top)
                .finish_non_exhaustive(),
            Self::Dynamic(r) => f
                .debug_struct("DynamicRule")
                .field("name", &r.name)
                .field("kind", &r.kind)
                .field("prefix", &r.prefix)
                .field("top", &r.top)
                .finish_non_exhaustive(),
        }
    }
}
