//! A shared cache of compiled grammars.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, RwLock};

use crate::grammar::{Grammar, GrammarError};
use crate::token::Kind;

/// Maps a configuration key to a compiled grammar.
///
/// Cloning a cache yields another handle to the same storage. Lookups of
/// existing entries only take a read lock; on a miss, the first writer builds
/// and stores the grammar, and concurrent writers reuse it.
pub struct GrammarCache<Q, K> {
    grammars: Arc<RwLock<HashMap<Q, Arc<Grammar<K>>>>>,
}

impl<Q, K> Clone for GrammarCache<Q, K> {
    fn clone(&self) -> Self {
        Self {
            grammars: self.grammars.clone(),
        }
    }
}

impl<Q, K> Default for GrammarCache<Q, K> {
    fn default() -> Self {
        Self {
            grammars: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<Q: Hash + Eq + Clone + Debug, K: Kind> GrammarCache<Q, K> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the grammar for `key`, building it with `build` if absent.
    pub fn get_or_build(
        &self,
        key: &Q,
        build: impl FnOnce(&Q) -> Result<Grammar<K>, GrammarError>,
    ) -> Result<Arc<Grammar<K>>, GrammarError> {
        {
            let grammars = self.grammars.read().unwrap_or_else(|e| e.into_inner());
            if let Some(grammar) = grammars.get(key) {
                tracing::trace!(?key, "grammar cache hit");
                return Ok(grammar.clone());
            }
        }

        let mut grammars = self.grammars.write().unwrap_or_else(|e| e.into_inner());
        if let Some(grammar) = grammars.get(key) {
            return Ok(grammar.clone());
        }
        tracing::debug!(?key, "grammar cache miss, building grammar");
        let grammar = Arc::new(build(key)?);
        grammars.insert(key.clone(), grammar.clone());
        Ok(grammar)
    }

    /// The number of cached grammars.
    pub fn len(&self) -> usize {
        self.grammars.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Returns `true` if no grammar has been cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
