//! The operator-precedence evaluator.
//!
//! Expressions are evaluated in a single left-to-right scan without building
//! a syntax tree. Operands go on a value stack and operators on an operator
//! stack (Dijkstra's shunting-yard algorithm); an operator is applied as soon
//! as an operator of lower precedence, a closing delimiter or the end of the
//! text arrives.
//!
//! Whether the scanner expects an operand or a binary operator next decides
//! how `+`, `-` and `(` are read, so prefix and binary uses never need
//! backtracking.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{EvalError, Result};
use crate::function::{Arguments, CallContext, Function};
use crate::number;
use crate::scope::Scope;

/// Names referenced by an expression.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FreeNames {
    /// Referenced parameter names, lowercased.
    pub parameters: BTreeSet<String>,
    /// Referenced function names, lowercased.
    pub functions: BTreeSet<String>,
}

/// Resolves names while an expression is evaluated.
pub(crate) trait Resolver {
    /// Resolves a parameter reference.
    fn parameter(&self, name: &str, expression: &str) -> Result<f64>;
    /// Looks up a registered function.
    fn function(&self, name: &str) -> Option<Arc<Function>>;
    /// Every registered infix function visible to the expression.
    fn infix_functions(&self) -> Vec<Arc<Function>>;
    /// Calls a registered function.
    fn call(&self, function: &Function, args: Arguments<'_>) -> Result<f64>;
    /// Handles a call to a function that is neither registered nor built in.
    fn unknown_function(&self, name: &str, expression: &str) -> Result<f64>;
    /// Observes a function name as it is scanned.
    fn note_function(&self, _name: &str) {}
}

/// Resolves names through a scope and calls functions for real.
pub(crate) struct Live<'a> {
    pub(crate) ctx: CallContext<'a>,
}

/// Records names instead of resolving them.
pub(crate) struct DryRun<'a> {
    pub(crate) scope: &'a Scope<'a>,
    pub(crate) names: RefCell<FreeNames>,
}

fn constant(name: &str) -> Option<f64> {
    if name.eq_ignore_ascii_case("pi") {
        Some(std::f64::consts::PI)
    } else if name.eq_ignore_ascii_case("e") {
        Some(std::f64::consts::E)
    } else {
        None
    }
}

impl Resolver for Live<'_> {
    fn parameter(&self, name: &str, expression: &str) -> Result<f64> {
        self.ctx
            .scope
            .parameter(name)
            .or_else(|| constant(name))
            .ok_or_else(|| EvalError::UnknownParameter {
                name: name.to_string(),
                expression: expression.to_string(),
            })
    }

    fn function(&self, name: &str) -> Option<Arc<Function>> {
        self.ctx.scope.function(name)
    }

    fn infix_functions(&self) -> Vec<Arc<Function>> {
        self.ctx.scope.infix_functions()
    }

    fn call(&self, function: &Function, args: Arguments<'_>) -> Result<f64> {
        function.call(args, &self.ctx)
    }

    fn unknown_function(&self, name: &str, expression: &str) -> Result<f64> {
        Err(EvalError::UnknownFunction {
            name: name.to_string(),
            expression: expression.to_string(),
        })
    }
}

impl Resolver for DryRun<'_> {
    fn parameter(&self, name: &str, _expression: &str) -> Result<f64> {
        self.names
            .borrow_mut()
            .parameters
            .insert(name.to_ascii_lowercase());
        Ok(0.0)
    }

    fn function(&self, name: &str) -> Option<Arc<Function>> {
        self.scope.function(name)
    }

    fn infix_functions(&self) -> Vec<Arc<Function>> {
        self.scope.infix_functions()
    }

    fn call(&self, function: &Function, args: Arguments<'_>) -> Result<f64> {
        self.note_function(function.name());
        if let Arguments::Raw(args) = args {
            // Raw arguments are often expressions evaluated later
            // (`table`, `lazy`), so their names belong to the read set too.
            // Arguments that are not expressions are ignored.
            for arg in args {
                let _ = Machine::new(arg, self).run();
            }
        }
        Ok(0.0)
    }

    fn unknown_function(&self, name: &str, _expression: &str) -> Result<f64> {
        self.note_function(name);
        Ok(0.0)
    }

    fn note_function(&self, name: &str) {
        self.names
            .borrow_mut()
            .functions
            .insert(name.to_ascii_lowercase());
    }
}

/// Functions resolved by name while scanning, without a scope lookup.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Builtin {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Abs,
    Floor,
    Ceil,
    Cbrt,
    Atan2,
    Hypot,
}

impl Builtin {
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "asinh" => Self::Asinh,
            "acosh" => Self::Acosh,
            "atanh" => Self::Atanh,
            "exp" => Self::Exp,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "cbrt" => Self::Cbrt,
            "atan2" => Self::Atan2,
            "hypot" => Self::Hypot,
            _ => return None,
        })
    }

    fn arity(self) -> usize {
        match self {
            Self::Atan2 | Self::Hypot => 2,
            _ => 1,
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        let x = args[0];
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Asinh => x.asinh(),
            Self::Acosh => x.acosh(),
            Self::Atanh => x.atanh(),
            Self::Exp => x.exp(),
            Self::Abs => x.abs(),
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Cbrt => x.cbrt(),
            Self::Atan2 => x.atan2(args[1]),
            Self::Hypot => x.hypot(args[1]),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum UnaryOp {
    Plus,
    Neg,
    Not,
}

enum Callee {
    Function(Arc<Function>),
    Builtin(Builtin),
    Unknown(String),
}

enum Op {
    Binary(BinaryOp),
    Unary(UnaryOp),
    Infix(Arc<Function>),
    Paren,
    Call { callee: Callee, base: usize },
    /// A `?` waiting for its `:`.
    Conditional,
    /// A complete `?:`, applied like a ternary operator.
    Alternative,
}

const TERNARY: u8 = 1;
const UNARY: u8 = 8;
const POWER: u8 = 9;

impl BinaryOp {
    fn precedence(self) -> u8 {
        match self {
            Self::Or => 2,
            Self::And => 3,
            Self::Eq | Self::Ne => 4,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => 5,
            Self::Add | Self::Sub => 6,
            Self::Mul | Self::Div | Self::Mod => 7,
            Self::Pow => POWER,
        }
    }
}

impl Op {
    /// The precedence of an applicable operator, or `None` for grouping
    /// operators, which are never applied implicitly.
    fn precedence(&self) -> Option<u8> {
        match self {
            Self::Binary(op) => Some(op.precedence()),
            Self::Unary(_) => Some(UNARY),
            Self::Infix(_) => Some(POWER),
            Self::Alternative => Some(TERNARY),
            Self::Paren | Self::Call { .. } | Self::Conditional => None,
        }
    }
}

/// Binary operators, longest spelling first.
const OPERATORS: &[(&str, BinaryOp)] = &[
    ("||", BinaryOp::Or),
    ("&&", BinaryOp::And),
    ("==", BinaryOp::Eq),
    ("!=", BinaryOp::Ne),
    ("<>", BinaryOp::Ne),
    ("<=", BinaryOp::Le),
    (">=", BinaryOp::Ge),
    ("<", BinaryOp::Lt),
    (">", BinaryOp::Gt),
    ("+", BinaryOp::Add),
    ("-", BinaryOp::Sub),
    ("*", BinaryOp::Mul),
    ("/", BinaryOp::Div),
    ("%", BinaryOp::Mod),
    ("^", BinaryOp::Pow),
];

#[inline]
fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

#[inline]
fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'_' | b'.' | b'$' | b'#')
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// A single evaluation pass over an expression.
pub(crate) struct Machine<'e, R> {
    text: &'e str,
    pos: usize,
    resolver: &'e R,
    values: Vec<f64>,
    ops: Vec<Op>,
    infix: Vec<Arc<Function>>,
    expect_binary: bool,
}

impl<'e, R: Resolver> Machine<'e, R> {
    pub(crate) fn new(text: &'e str, resolver: &'e R) -> Self {
        let mut infix = resolver.infix_functions();
        // Longest names first, so `**` is tried before a shorter operator.
        infix.sort_by(|a, b| b.name().len().cmp(&a.name().len()));
        Self {
            text,
            pos: 0,
            resolver,
            values: Vec::new(),
            ops: Vec::new(),
            infix,
            expect_binary: false,
        }
    }

    pub(crate) fn run(mut self) -> Result<f64> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            return Err(EvalError::Empty);
        }
        if (trimmed.starts_with('{') && trimmed.ends_with('}'))
            || (trimmed.len() > 1 && trimmed.starts_with('\'') && trimmed.ends_with('\''))
        {
            return Err(EvalError::Bracketed {
                expression: self.text.to_string(),
            });
        }

        loop {
            self.skip_whitespace();
            if self.pos >= self.text.len() {
                break;
            }
            if self.expect_binary {
                self.binary()?;
            } else {
                self.operand()?;
            }
        }

        if !self.expect_binary {
            return Err(self.underflow());
        }
        while let Some(op) = self.ops.pop() {
            match op {
                Op::Paren | Op::Call { .. } => {
                    return Err(EvalError::UnbalancedParentheses {
                        expression: self.text.to_string(),
                    })
                }
                Op::Conditional => return Err(self.unmatched_conditional()),
                op => self.apply(op)?,
            }
        }
        match self.values.as_slice() {
            [value] => Ok(*value),
            _ => Err(self.underflow()),
        }
    }

    fn rest(&self) -> &'e str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn unexpected(&self) -> EvalError {
        let text: String = self
            .rest()
            .chars()
            .take_while(|c| !c.is_whitespace())
            .collect();
        EvalError::UnexpectedText {
            text,
            offset: self.pos,
            expression: self.text.to_string(),
        }
    }

    fn underflow(&self) -> EvalError {
        EvalError::StackUnderflow {
            expression: self.text.to_string(),
        }
    }

    fn unmatched_conditional(&self) -> EvalError {
        EvalError::UnmatchedConditional {
            expression: self.text.to_string(),
        }
    }

    fn unbalanced(&self) -> EvalError {
        EvalError::UnbalancedParentheses {
            expression: self.text.to_string(),
        }
    }

    fn in_call(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, Op::Call { .. }))
    }

    fn identifier(&mut self) -> &'e str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_ident_char(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
        &self.text[start..self.pos]
    }

    /// Scans an operand or a prefix operator.
    fn operand(&mut self) -> Result<()> {
        let Some(c) = self.peek() else {
            return Err(self.underflow());
        };
        match c {
            b'(' => {
                self.pos += 1;
                self.ops.push(Op::Paren);
            }
            b'+' => {
                self.pos += 1;
                self.ops.push(Op::Unary(UnaryOp::Plus));
            }
            b'-' => {
                self.pos += 1;
                self.ops.push(Op::Unary(UnaryOp::Neg));
            }
            b'!' => {
                self.pos += 1;
                self.ops.push(Op::Unary(UnaryOp::Not));
            }
            b')' => {
                // Only valid as the end of an empty argument list.
                match self.ops.last() {
                    Some(Op::Call { base, .. }) if *base == self.values.len() => {
                        self.pos += 1;
                        self.finish_call()?;
                    }
                    _ => return Err(self.unexpected()),
                }
            }
            b'@' => {
                self.pos += 1;
                let value = self.reference()?;
                self.values.push(value);
                self.expect_binary = true;
            }
            c if c.is_ascii_digit()
                || (c == b'.'
                    && self
                        .text
                        .as_bytes()
                        .get(self.pos + 1)
                        .is_some_and(u8::is_ascii_digit)) =>
            {
                let comma_decimal = !self.in_call();
                let (rest, value) = number::literal(comma_decimal)(self.rest())
                    .map_err(|_| self.unexpected())?;
                self.pos = self.text.len() - rest.len();
                self.values.push(value);
                self.expect_binary = true;
            }
            c if is_ident_start(c) => {
                let name = self.identifier();
                let after_name = self.pos;
                self.skip_whitespace();
                if self.peek() == Some(b'(') {
                    self.pos += 1;
                    self.call(name)?;
                } else {
                    self.pos = after_name;
                    let value = self.resolver.parameter(name, self.text)?;
                    self.values.push(value);
                    self.expect_binary = true;
                }
            }
            _ => return Err(self.unexpected()),
        }
        Ok(())
    }

    /// Scans a binary operator or a closing delimiter.
    fn binary(&mut self) -> Result<()> {
        let rest = self.rest();

        let infix = self.infix.iter().find(|f| {
            let name = f.name().as_str();
            rest.len() >= name.len()
                && rest.is_char_boundary(name.len())
                && rest[..name.len()].eq_ignore_ascii_case(name)
                && !(name.bytes().last().is_some_and(is_ident_char)
                    && rest.as_bytes().get(name.len()).is_some_and(|c| is_ident_char(*c)))
        });
        if let Some(f) = infix.cloned() {
            self.pos += f.name().len();
            self.reduce(POWER, false)?;
            self.ops.push(Op::Infix(f));
            self.expect_binary = false;
            return Ok(());
        }

        match rest.as_bytes()[0] {
            b')' => {
                self.pos += 1;
                self.close()?;
            }
            b',' => {
                self.pos += 1;
                self.comma()?;
            }
            b'?' => {
                self.pos += 1;
                self.reduce(TERNARY, true)?;
                self.ops.push(Op::Conditional);
                self.expect_binary = false;
            }
            b':' => {
                self.pos += 1;
                self.colon()?;
            }
            _ => {
                let (spelling, op) = OPERATORS
                    .iter()
                    .find(|(s, _)| rest.starts_with(s))
                    .copied()
                    .ok_or_else(|| self.unexpected())?;
                self.pos += spelling.len();
                self.reduce(op.precedence(), false)?;
                self.ops.push(Op::Binary(op));
                self.expect_binary = false;
            }
        }
        Ok(())
    }

    /// Applies stacked operators that bind at least as tightly as an incoming
    /// operator of the given precedence.
    fn reduce(&mut self, precedence: u8, right_assoc: bool) -> Result<()> {
        while let Some(top) = self.ops.last().and_then(Op::precedence) {
            if top > precedence || (top == precedence && !right_assoc) {
                let op = self.ops.pop().ok_or_else(|| self.underflow())?;
                self.apply(op)?;
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Applies operators until a grouping operator is on top.
    fn reduce_group(&mut self) -> Result<()> {
        while self.ops.last().and_then(Op::precedence).is_some() {
            let op = self.ops.pop().ok_or_else(|| self.underflow())?;
            self.apply(op)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.reduce_group()?;
        match self.ops.last() {
            Some(Op::Paren) => {
                self.ops.pop();
                Ok(())
            }
            Some(Op::Call { .. }) => self.finish_call(),
            Some(Op::Conditional) => Err(self.unmatched_conditional()),
            _ => Err(self.unbalanced()),
        }
    }

    fn comma(&mut self) -> Result<()> {
        self.reduce_group()?;
        match self.ops.last() {
            Some(Op::Call { .. }) => {
                self.expect_binary = false;
                Ok(())
            }
            Some(Op::Conditional) => Err(self.unmatched_conditional()),
            _ => Err(EvalError::UnexpectedText {
                text: ",".to_string(),
                offset: self.pos - 1,
                expression: self.text.to_string(),
            }),
        }
    }

    fn colon(&mut self) -> Result<()> {
        loop {
            match self.ops.last() {
                Some(Op::Conditional) => {
                    self.ops.pop();
                    self.ops.push(Op::Alternative);
                    self.expect_binary = false;
                    return Ok(());
                }
                Some(Op::Paren | Op::Call { .. }) | None => {
                    return Err(self.unmatched_conditional())
                }
                Some(_) => {
                    let op = self.ops.pop().ok_or_else(|| self.underflow())?;
                    self.apply(op)?;
                }
            }
        }
    }

    /// Starts a call after its opening parenthesis has been consumed.
    fn call(&mut self, name: &'e str) -> Result<()> {
        let callee = match self.resolver.function(name) {
            Some(f) if f.is_raw() => {
                let args = self.raw_arguments()?;
                let value = self.resolver.call(&f, Arguments::Raw(&args))?;
                self.values.push(value);
                self.expect_binary = true;
                return Ok(());
            }
            Some(f) => Callee::Function(f),
            None => match Builtin::lookup(name) {
                Some(b) => {
                    self.resolver.note_function(name);
                    Callee::Builtin(b)
                }
                None => Callee::Unknown(name.to_string()),
            },
        };
        self.ops.push(Op::Call {
            callee,
            base: self.values.len(),
        });
        self.expect_binary = false;
        Ok(())
    }

    /// Pops the call on top of the operator stack and applies it to the
    /// values pushed since the call started.
    fn finish_call(&mut self) -> Result<()> {
        let Some(Op::Call { callee, base }) = self.ops.pop() else {
            return Err(self.unbalanced());
        };
        if base > self.values.len() {
            return Err(self.underflow());
        }
        let args = self.values.split_off(base);
        let value = match callee {
            Callee::Function(f) => self.resolver.call(&f, Arguments::Values(&args))?,
            Callee::Builtin(b) => {
                if args.len() != b.arity() {
                    return Err(EvalError::Arity {
                        name: format!("{b:?}").to_ascii_lowercase(),
                        expected: b.arity().to_string(),
                        found: args.len(),
                    });
                }
                b.apply(&args)
            }
            Callee::Unknown(name) => self.resolver.unknown_function(&name, self.text)?,
        };
        self.values.push(value);
        self.expect_binary = true;
        Ok(())
    }

    /// Captures the raw text of each argument up to the matching `)`.
    fn raw_arguments(&mut self) -> Result<Vec<String>> {
        let bytes = self.text.as_bytes();
        let mut args = Vec::new();
        let mut depth = 1usize;
        let mut start = self.pos;
        let mut i = self.pos;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b'"' => {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'"' {
                        i += 1;
                    }
                }
                b',' if depth == 1 => {
                    args.push(self.text[start..i].trim().to_string());
                    start = i + 1;
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let last = self.text[start..i].trim();
                        if !(args.is_empty() && last.is_empty()) {
                            args.push(last.to_string());
                        }
                        self.pos = i + 1;
                        return Ok(args);
                    }
                }
                _ => (),
            }
            i += 1;
        }
        Err(self.unbalanced())
    }

    /// Scans `name[property]` after an `@` and resolves it through the `@`
    /// function.
    fn reference(&mut self) -> Result<f64> {
        let name = self.identifier();
        if name.is_empty() {
            return Err(self.unexpected());
        }
        let mut args = vec![name.to_string()];
        if self.peek() == Some(b'[') {
            let start = self.pos + 1;
            let end = self.rest().find(']').map(|i| self.pos + i).ok_or_else(|| {
                EvalError::UnexpectedText {
                    text: self.rest().to_string(),
                    offset: self.pos,
                    expression: self.text.to_string(),
                }
            })?;
            args.push(self.text[start..end].trim().to_string());
            self.pos = end + 1;
        }
        match self.resolver.function("@") {
            Some(f) if f.is_raw() => self.resolver.call(&f, Arguments::Raw(&args)),
            Some(_) => Err(EvalError::function(
                "@",
                "reference lookups take raw arguments",
            )),
            None => self.resolver.unknown_function("@", self.text),
        }
    }

    fn pop(&mut self) -> Result<f64> {
        self.values.pop().ok_or_else(|| self.underflow())
    }

    fn apply(&mut self, op: Op) -> Result<()> {
        let value = match op {
            Op::Unary(op) => {
                let x = self.pop()?;
                match op {
                    UnaryOp::Plus => x,
                    UnaryOp::Neg => -x,
                    UnaryOp::Not => bool_value(x == 0.0),
                }
            }
            Op::Binary(op) => {
                let b = self.pop()?;
                let a = self.pop()?;
                match op {
                    BinaryOp::Or => bool_value(a != 0.0 || b != 0.0),
                    BinaryOp::And => bool_value(a != 0.0 && b != 0.0),
                    BinaryOp::Eq => bool_value(a == b),
                    BinaryOp::Ne => bool_value(a != b),
                    BinaryOp::Lt => bool_value(a < b),
                    BinaryOp::Le => bool_value(a <= b),
                    BinaryOp::Gt => bool_value(a > b),
                    BinaryOp::Ge => bool_value(a >= b),
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    // `^` follows the dialect's `pow` when one is registered.
                    BinaryOp::Pow => match self.resolver.function("pow") {
                        Some(f) if !f.is_raw() => {
                            self.resolver.call(&f, Arguments::Values(&[a, b]))?
                        }
                        _ => a.powf(b),
                    },
                }
            }
            Op::Infix(f) => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.resolver.call(&f, Arguments::Values(&[a, b]))?
            }
            Op::Alternative => {
                let otherwise = self.pop()?;
                let then = self.pop()?;
                let condition = self.pop()?;
                if condition != 0.0 {
                    then
                } else {
                    otherwise
                }
            }
            Op::Paren | Op::Call { .. } => return Err(self.unbalanced()),
            Op::Conditional => return Err(self.unmatched_conditional()),
        };
        self.values.push(value);
        Ok(())
    }
}

/// Evaluates `text` in `scope`.
pub fn evaluate(text: &str, scope: &Scope<'_>) -> Result<f64> {
    scope.evaluate(text)
}
