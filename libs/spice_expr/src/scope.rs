//! Evaluation scopes.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{trace, warn};
use unicase::UniCase;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::eval::{DryRun, FreeNames, Live, Machine};
use crate::function::{CallContext, Function};
use crate::library;

/// A callback receiving the freshly computed value of a dynamic expression.
///
/// The callback gets the scope the expression is registered in and may set
/// further parameters on it.
pub type DynamicCallback = Box<dyn for<'s> FnMut(&mut Scope<'s>, f64) -> Result<()> + Send>;

/// An expression re-evaluated whenever one of the parameters it reads changes.
pub struct DynamicExpression {
    text: String,
    reads: HashSet<UniCase<String>>,
    callback: Mutex<DynamicCallback>,
}

impl DynamicExpression {
    /// The expression text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` if the expression depends on the parameter `name`.
    pub fn reads(&self, name: &str) -> bool {
        self.reads.contains(&UniCase::new(name.to_string()))
    }
}

impl Debug for DynamicExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicExpression")
            .field("text", &self.text)
            .field("reads", &self.reads)
            .finish_non_exhaustive()
    }
}

/// A set of parameters and functions against which expressions are evaluated.
///
/// Scopes form a chain: lookups that miss in a child scope fall through to
/// its parent, while writes always land in the scope they are made on. A
/// child borrows its parent, so the parent cannot change while the child is
/// alive.
///
/// Names are case-insensitive.
pub struct Scope<'p> {
    parent: Option<&'p Scope<'p>>,
    dialect: Dialect,
    parameters: HashMap<UniCase<String>, f64>,
    functions: HashMap<UniCase<String>, Arc<Function>>,
    registrations: Vec<Arc<DynamicExpression>>,
    /// Only set on root scopes.
    rng: Option<Mutex<StdRng>>,
}

impl Scope<'static> {
    /// Creates a root scope with the function library of `dialect`
    /// registered.
    pub fn new(dialect: Dialect) -> Self {
        let mut scope = Self::empty(dialect);
        library::register(&mut scope);
        scope
    }

    /// Creates a root scope without any registered functions.
    ///
    /// Built-in elementary functions and the constants `pi` and `e` remain
    /// available.
    pub fn empty(dialect: Dialect) -> Self {
        Self {
            parent: None,
            dialect,
            parameters: HashMap::new(),
            functions: HashMap::new(),
            registrations: Vec::new(),
            rng: Some(Mutex::new(StdRng::from_entropy())),
        }
    }
}

impl<'p> Scope<'p> {
    /// Creates a child scope.
    pub fn child(&self) -> Scope<'_> {
        Scope {
            parent: Some(self),
            dialect: self.dialect,
            parameters: HashMap::new(),
            functions: HashMap::new(),
            registrations: Vec::new(),
            rng: None,
        }
    }

    /// The parent scope, if any.
    #[inline]
    pub fn parent(&self) -> Option<&Scope<'p>> {
        self.parent
    }

    /// The numeric dialect of the scope.
    #[inline]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn root(&self) -> &Scope<'_> {
        let mut scope: &Scope<'_> = self;
        while let Some(parent) = scope.parent {
            scope = parent;
        }
        scope
    }

    /// Reseeds the random generator shared by this scope's chain.
    pub fn seed(&self, seed: u64) {
        self.with_rng(|rng| *rng = StdRng::seed_from_u64(seed));
    }

    /// Runs `f` with exclusive access to the random generator of the root
    /// scope.
    pub fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let root = self.root();
        match &root.rng {
            Some(rng) => f(&mut rng.lock().unwrap_or_else(PoisonError::into_inner)),
            // Unreachable for scopes built through the public constructors.
            None => f(&mut StdRng::from_entropy()),
        }
    }

    /// Looks up a parameter in this scope or its ancestors.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        let key = UniCase::new(name.to_string());
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(value) = s.parameters.get(&key) {
                return Some(*value);
            }
            scope = s.parent;
        }
        None
    }

    /// Returns `true` if the parameter `name` is defined in this scope or its
    /// ancestors.
    #[inline]
    pub fn is_defined(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }

    /// Looks up a function in this scope or its ancestors.
    pub fn function(&self, name: &str) -> Option<Arc<Function>> {
        let key = UniCase::new(name.to_string());
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(f) = s.functions.get(&key) {
                return Some(f.clone());
            }
            scope = s.parent;
        }
        None
    }

    /// Every infix function visible from this scope, innermost definitions
    /// first.
    pub fn infix_functions(&self) -> Vec<Arc<Function>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut scope = Some(self);
        while let Some(s) = scope {
            for (name, f) in s.functions.iter() {
                if seen.insert(name.clone()) && f.is_infix() {
                    out.push(f.clone());
                }
            }
            scope = s.parent;
        }
        out
    }

    /// Defines a function in this scope, replacing any function of the same
    /// name defined here and shadowing those of ancestors.
    pub fn define_function(&mut self, function: Function) {
        self.functions.insert(
            UniCase::new(function.name().to_string()),
            Arc::new(function),
        );
    }

    /// Sets a parameter in this scope.
    ///
    /// Every dynamic expression registered in this scope that reads `name` is
    /// then re-evaluated and its callback invoked, in registration order. A
    /// registration whose callback is already running is skipped.
    pub fn set_parameter(&mut self, name: &str, value: f64) -> Result<()> {
        let key = UniCase::new(name.to_string());
        self.parameters.insert(key.clone(), value);

        let affected: Vec<_> = self
            .registrations
            .iter()
            .filter(|r| r.reads.contains(&key))
            .cloned()
            .collect();
        for registration in affected {
            let Ok(mut callback) = registration.callback.try_lock() else {
                warn!(
                    expression = %registration.text,
                    parameter = name,
                    "skipping re-entrant refresh of dynamic expression"
                );
                continue;
            };
            let value = self.evaluate(&registration.text)?;
            trace!(expression = %registration.text, value, "refreshing dynamic expression");
            (&mut **callback)(self, value)?;
        }
        Ok(())
    }

    /// Registers an expression to be re-evaluated whenever one of the
    /// parameters in `reads` is set on this scope.
    ///
    /// The expression is not evaluated on registration. Use
    /// [`Scope::free_names`] to compute `reads`.
    pub fn add_dynamic_expression<I, S>(
        &mut self,
        text: impl Into<String>,
        reads: I,
        callback: impl for<'s> FnMut(&mut Scope<'s>, f64) -> Result<()> + Send + 'static,
    ) where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registration = DynamicExpression {
            text: text.into(),
            reads: reads
                .into_iter()
                .map(|name| UniCase::new(name.as_ref().to_string()))
                .collect(),
            callback: Mutex::new(Box::new(callback)),
        };
        trace!(?registration, "registered dynamic expression");
        self.registrations.push(Arc::new(registration));
    }

    /// The dynamic expressions registered in this scope.
    pub fn dynamic_expressions(&self) -> impl Iterator<Item = &DynamicExpression> {
        self.registrations.iter().map(|r| r.as_ref())
    }

    /// Evaluates `text` and stores the result as the parameter `name`.
    ///
    /// The parameter is kept up to date: whenever a parameter the expression
    /// reads is set on this scope, the expression is re-evaluated and `name`
    /// is set again.
    pub fn set_parameter_expression(&mut self, name: &str, text: &str) -> Result<f64> {
        let value = self.evaluate(text)?;
        let reads = self.free_names(text)?.parameters;
        self.set_parameter(name, value)?;
        let target = name.to_string();
        self.add_dynamic_expression(text, reads, move |scope, value| {
            scope.set_parameter(&target, value)
        });
        Ok(value)
    }

    /// Evaluates an expression.
    ///
    /// The expression must not carry its outer `{}` or `''` delimiters.
    pub fn evaluate(&self, text: &str) -> Result<f64> {
        self.evaluate_with(text, None)
    }

    /// Evaluates an expression, passing an opaque simulation handle through to
    /// every function called.
    pub fn evaluate_with(&self, text: &str, simulation: Option<&dyn Any>) -> Result<f64> {
        let resolver = Live {
            ctx: CallContext {
                scope: self,
                simulation,
            },
        };
        Machine::new(text, &resolver).run()
    }

    /// Collects the parameter and function names an expression references,
    /// without requiring them to resolve.
    pub fn free_names(&self, text: &str) -> Result<FreeNames> {
        let resolver = DryRun {
            scope: self,
            names: RefCell::new(FreeNames::default()),
        };
        Machine::new(text, &resolver).run()?;
        Ok(resolver.names.into_inner())
    }
}

impl Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("dialect", &self.dialect)
            .field("parameters", &self.parameters)
            .field("functions", &self.functions.len())
            .field("registrations", &self.registrations.len())
            .field("parent", &self.parent)
            .finish()
    }
}
