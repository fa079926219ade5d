//! TOML configuration files.
//!
//! ```toml
//! dialect = "hspice"
//! seed = 7
//!
//! [lexer]
//! has_title = true
//! window = "logical"
//!
//! [parameters]
//! vdd = 1.8
//! half = "vdd / 2"
//! ```
//!
//! Parameters are evaluated in the order they appear, so an expression may
//! refer to any parameter defined above it.

use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use spice::SpiceLexerOptions;
use spice_expr::{Dialect, Scope};

/// The contents of a configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Options for the SPICE lexer.
    pub lexer: SpiceLexerOptions,
    /// The numeric dialect used for evaluation.
    pub dialect: Dialect,
    /// A seed for the random functions.
    pub seed: Option<u64>,
    /// Parameters to define before evaluating, in order.
    pub parameters: IndexMap<String, ParameterValue>,
}

/// The value of a configured parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    /// A number.
    Number(f64),
    /// An expression evaluated against the parameters defined before it.
    Expression(String),
}

impl Config {
    /// Reads a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {:?}.", path))?;
        Self::from_toml(&text)
            .with_context(|| format!("Failed to parse configuration file {:?}.", path))
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Builds a root scope holding the configured parameters.
    pub fn scope(&self) -> anyhow::Result<Scope<'static>> {
        let mut scope = Scope::new(self.dialect);
        if let Some(seed) = self.seed {
            scope.seed(seed);
        }
        for (name, value) in self.parameters.iter() {
            match value {
                ParameterValue::Number(v) => scope.set_parameter(name, *v)?,
                ParameterValue::Expression(text) => {
                    let v = scope
                        .set_parameter_expression(name, text)
                        .with_context(|| format!("Failed to evaluate parameter `{name}`."))?;
                    tracing::debug!(name = %name, value = v, "defined parameter");
                }
            }
        }
        Ok(scope)
    }
}
