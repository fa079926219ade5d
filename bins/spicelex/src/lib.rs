//! Tokenize SPICE netlists and evaluate SPICE expressions from the command
//! line.
#![warn(missing_docs)]

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rulelex::{Continuation, LogicalLines, Window};
use spice::SpiceLexer;
use spice_expr::Dialect;

pub mod config;

pub use config::{Config, ParameterValue};

/// Arguments to [`run`].
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// A TOML configuration file.
    ///
    /// Command-line flags override values from the file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// The action to perform.
    #[command(subcommand)]
    pub command: Command,
}

/// A `spicelex` action.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the tokens of a netlist, one per line.
    Tokens {
        /// Treat the first line as a title.
        #[arg(long)]
        title: bool,
        /// Print comments.
        #[arg(long)]
        keep_comments: bool,
        /// Recognize bus suffixes and prefixes.
        #[arg(long)]
        bus: bool,
        /// Also print whitespace and continuation markers.
        #[arg(long)]
        suppressed: bool,
        /// The candidate window: `line`, `logical` or `full`.
        #[arg(long, value_parser = parse_window)]
        window: Option<Window>,
        /// The input netlist file.
        input: PathBuf,
    },
    /// Print the logical lines of a netlist, with continuations spliced.
    Lines {
        /// The input netlist file.
        input: PathBuf,
    },
    /// Evaluate expressions and print their values.
    Eval {
        /// The numeric dialect.
        #[arg(short, long)]
        dialect: Option<Dialect>,
        /// A seed for the random functions.
        #[arg(long)]
        seed: Option<u64>,
        /// A parameter definition of the form `name=expression`.
        ///
        /// May be repeated; definitions are evaluated in order after those of
        /// the configuration file.
        #[arg(short, long = "param", value_parser = parse_assignment)]
        params: Vec<(String, String)>,
        /// The expressions to evaluate.
        #[arg(required = true)]
        expressions: Vec<String>,
    },
}

fn parse_window(s: &str) -> Result<Window, String> {
    match s.to_ascii_lowercase().as_str() {
        "line" => Ok(Window::Line),
        "logical" => Ok(Window::Logical),
        "full" => Ok(Window::Full),
        _ => Err(format!("invalid window `{s}`")),
    }
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected `name=expression`, found `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in `{s}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Strips the outer `{}` or `''` delimiters a netlist would put around an
/// expression.
fn bare_expression(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .or_else(|| text.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(text)
}

fn read_input(input: &PathBuf) -> anyhow::Result<String> {
    std::fs::read_to_string(input).with_context(|| format!("Failed to read input file {:?}.", input))
}

/// Runs a command, writing its output to `out`.
pub fn run(args: Args, out: &mut impl Write) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Tokens {
            title,
            keep_comments,
            bus,
            suppressed,
            window,
            input,
        } => {
            let options = &mut config.lexer;
            options.has_title |= title;
            options.keep_comments |= keep_comments;
            options.enable_bus_syntax |= bus;
            if let Some(window) = window {
                options.window = window;
            }
            let text = read_input(&input)?;
            let lexer = SpiceLexer::new(config.lexer)
                .with_context(|| "Failed to build the SPICE grammar.")?
                .with_file(input.display().to_string())
                .keep_suppressed(suppressed);
            for token in lexer.tokens(&text) {
                let token = token.with_context(|| format!("Failed to tokenize {:?}.", input))?;
                if token.suppressed {
                    writeln!(out, "~{token}")?;
                } else {
                    writeln!(out, "{token}")?;
                }
            }
        }
        Command::Lines { input } => {
            let text = read_input(&input)?;
            for line in LogicalLines::new(&text, Continuation::spice()) {
                writeln!(out, "{}: {}", line.line, line.text)?;
            }
        }
        Command::Eval {
            dialect,
            seed,
            params,
            expressions,
        } => {
            if let Some(dialect) = dialect {
                config.dialect = dialect;
            }
            if seed.is_some() {
                config.seed = seed;
            }
            config.parameters.extend(
                params
                    .into_iter()
                    .map(|(name, text)| (name, ParameterValue::Expression(text))),
            );
            let scope = config.scope()?;
            for expression in expressions {
                let value = scope
                    .evaluate(bare_expression(&expression))
                    .with_context(|| format!("Failed to evaluate `{expression}`."))?;
                writeln!(out, "{value}")?;
            }
        }
    }

    Ok(())
}
