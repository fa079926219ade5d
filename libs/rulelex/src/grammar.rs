//! Grammars: ordered rule sets with named internal patterns.

use std::collections::HashMap;
use std::fmt::Debug;

use arcstr::ArcStr;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

use crate::rule::Rule;
use crate::token::Kind;

/// The maximum nesting depth of internal pattern references.
const MAX_EXPANSION_DEPTH: usize = 16;

/// An error building a [`Grammar`].
#[derive(Debug, Error)]
pub enum GrammarError {
    /// A rule referenced an internal pattern that was never defined.
    #[error("rule `{rule}` references unknown internal pattern `<{pattern}>`")]
    UnknownPattern {
        /// The referencing rule (or pattern).
        rule: ArcStr,
        /// The missing pattern name.
        pattern: String,
    },
    /// Internal patterns reference each other too deeply (likely a cycle).
    #[error("internal pattern references in `{rule}` nest too deeply")]
    ExpansionTooDeep {
        /// The rule being expanded.
        rule: ArcStr,
    },
    /// A pattern failed to compile.
    #[error("invalid pattern for rule `{rule}`: {source}")]
    InvalidPattern {
        /// The offending rule.
        rule: ArcStr,
        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },
}

pub(crate) struct CompiledRule<K> {
    pub(crate) rule: Rule<K>,
    /// The full pattern for static rules, the trigger prefix for dynamic rules.
    pub(crate) regex: Regex,
}

/// An immutable, ordered set of compiled lexer rules.
pub struct Grammar<K> {
    pub(crate) rules: Vec<CompiledRule<K>>,
    pub(crate) eof: K,
}

/// Builds a [`Grammar`].
pub struct GrammarBuilder<K> {
    patterns: HashMap<String, String>,
    rules: Vec<Rule<K>>,
    eof: K,
}

impl<K: Kind> GrammarBuilder<K> {
    /// Creates a builder for a grammar that ends every token stream with a
    /// token of kind `eof`.
    pub fn new(eof: K) -> Self {
        Self {
            patterns: HashMap::new(),
            rules: Vec::new(),
            eof,
        }
    }

    /// Defines an internal pattern that rules may reference as `<NAME>`.
    ///
    /// Internal patterns never produce tokens on their own.
    pub fn pattern(&mut self, name: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        self.patterns.insert(name.into(), pattern.into());
        self
    }

    /// Appends a rule.
    ///
    /// Among candidates of equal length, rules added earlier win.
    pub fn rule(&mut self, rule: impl Into<Rule<K>>) -> &mut Self {
        self.rules.push(rule.into());
        self
    }

    /// Expands internal pattern references in `pattern`.
    pub fn expand(&self, rule: &ArcStr, pattern: &str) -> Result<String, GrammarError> {
        self.expand_inner(rule, pattern, 0)
    }

    fn expand_inner(&self, rule: &ArcStr, pattern: &str, depth: usize) -> Result<String, GrammarError> {
        if depth > MAX_EXPANSION_DEPTH {
            return Err(GrammarError::ExpansionTooDeep { rule: rule.clone() });
        }
        let mut out = String::with_capacity(pattern.len());
        let mut last = 0;
        for caps in crate::PATTERN_REF_REGEX.captures_iter(pattern) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            let body = self
                .patterns
                .get(name)
                .ok_or_else(|| GrammarError::UnknownPattern {
                    rule: rule.clone(),
                    pattern: name.to_string(),
                })?;
            out.push_str(&pattern[last..whole.start()]);
            out.push_str("(?:");
            out.push_str(&self.expand_inner(rule, body, depth + 1)?);
            out.push(')');
            last = whole.end();
        }
        out.push_str(&pattern[last..]);
        Ok(out)
    }

    /// Compiles every rule, yielding an immutable [`Grammar`].
    pub fn build(self) -> Result<Grammar<K>, GrammarError> {
        let mut rules = Vec::with_capacity(self.rules.len());
        for rule in self.rules.iter() {
            let (source, case_insensitive) = match rule {
                Rule::Static(r) => (&r.pattern, r.case_insensitive),
                Rule::Dynamic(r) => (&r.prefix, false),
            };
            let expanded = self.expand(rule.name(), source)?;
            let regex = RegexBuilder::new(&format!("^(?:{expanded})"))
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|source| GrammarError::InvalidPattern {
                    rule: rule.name().clone(),
                    source,
                })?;
            rules.push(CompiledRule {
                rule: rule.clone(),
                regex,
            });
        }
        tracing::debug!(rules = rules.len(), "built lexer grammar");
        Ok(Grammar {
            rules,
            eof: self.eof,
        })
    }
}

impl<K: Kind> Grammar<K> {
    /// An iterator over the rules of this grammar, in priority order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule<K>> {
        self.rules.iter().map(|r| &r.rule)
    }

    /// The number of rules in this grammar.
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the grammar has no rules.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The kind of the synthetic end-of-input token.
    #[inline]
    pub fn eof(&self) -> K {
        self.eof
    }
}

impl<K: Debug> Debug for Grammar<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grammar")
            .field("rules", &self.rules.iter().map(|r| &r.rule).collect::<Vec<_>>())
            .field("eof", &self.eof)
            .finish()
    }
}
