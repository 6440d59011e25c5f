// src/expr/compiled.rs
//! Symbol resolution and slot-based evaluation
//!
//! Compilation replaces every symbol with its index into a flat slot
//! buffer laid out as `[state_0, .., state_{n-1}, param_0, .., param_{p-1}]`
//! and folds constant subtrees. The compiled tree is then evaluated once
//! per solver step without any name lookups.

use super::ast::Expr;
use crate::error::{SdeError, SdeResult};
use std::collections::HashMap;

/// Fixed mapping from symbol names to slot indices
#[derive(Debug, Clone)]
pub struct SymbolTable {
    slots: HashMap<String, usize>,
    state_dim: usize,
    param_count: usize,
}

impl SymbolTable {
    pub fn new<S: AsRef<str>, P: AsRef<str>>(
        state_symbols: &[S],
        param_symbols: &[P],
    ) -> SdeResult<Self> {
        let mut slots = HashMap::with_capacity(state_symbols.len() + param_symbols.len());
        let names = state_symbols
            .iter()
            .map(|s| s.as_ref())
            .chain(param_symbols.iter().map(|p| p.as_ref()));
        for (slot, name) in names.enumerate() {
            if slots.insert(name.to_string(), slot).is_some() {
                return Err(SdeError::CompilationError {
                    reason: format!("symbol '{}' is declared more than once", name),
                });
            }
        }
        Ok(Self {
            slots,
            state_dim: state_symbols.len(),
            param_count: param_symbols.len(),
        })
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }
}

/// Expression with symbols resolved to slot indices
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledExpr {
    Const(f64),
    Slot(usize),
    Neg(Box<CompiledExpr>),
    Add(Box<CompiledExpr>, Box<CompiledExpr>),
    Sub(Box<CompiledExpr>, Box<CompiledExpr>),
    Mul(Box<CompiledExpr>, Box<CompiledExpr>),
    Div(Box<CompiledExpr>, Box<CompiledExpr>),
    Pow(Box<CompiledExpr>, Box<CompiledExpr>),
    Sqrt(Box<CompiledExpr>),
    Exp(Box<CompiledExpr>),
    Ln(Box<CompiledExpr>),
    Sum(Vec<CompiledExpr>),
}

impl CompiledExpr {
    pub fn compile(expr: &Expr, table: &SymbolTable) -> SdeResult<Self> {
        let compiled = match expr {
            Expr::Num(v) => CompiledExpr::Const(*v),
            Expr::Sym(name) => match table.slot(name) {
                Some(slot) => CompiledExpr::Slot(slot),
                None => {
                    return Err(SdeError::CompilationError {
                        reason: format!("unknown symbol '{}'", name),
                    })
                }
            },
            Expr::Neg(a) => Self::unary(Self::compile(a, table)?, CompiledExpr::Neg, |x| -x),
            Expr::Sqrt(a) => Self::unary(Self::compile(a, table)?, CompiledExpr::Sqrt, f64::sqrt),
            Expr::Exp(a) => Self::unary(Self::compile(a, table)?, CompiledExpr::Exp, f64::exp),
            Expr::Ln(a) => Self::unary(Self::compile(a, table)?, CompiledExpr::Ln, f64::ln),
            Expr::Add(a, b) => Self::binary(a, b, table, CompiledExpr::Add, |x, y| x + y)?,
            Expr::Sub(a, b) => Self::binary(a, b, table, CompiledExpr::Sub, |x, y| x - y)?,
            Expr::Mul(a, b) => Self::binary(a, b, table, CompiledExpr::Mul, |x, y| x * y)?,
            Expr::Div(a, b) => Self::binary(a, b, table, CompiledExpr::Div, |x, y| x / y)?,
            Expr::Pow(a, b) => Self::binary(a, b, table, CompiledExpr::Pow, f64::powf)?,
            Expr::Sum(terms) => {
                let mut constant = 0.0;
                let mut rest = Vec::with_capacity(terms.len());
                for term in terms {
                    match Self::compile(term, table)? {
                        CompiledExpr::Const(v) => constant += v,
                        other => rest.push(other),
                    }
                }
                if rest.is_empty() {
                    CompiledExpr::Const(constant)
                } else {
                    if constant != 0.0 {
                        rest.push(CompiledExpr::Const(constant));
                    }
                    CompiledExpr::Sum(rest)
                }
            }
        };
        Ok(compiled)
    }

    fn unary(
        inner: CompiledExpr,
        build: fn(Box<CompiledExpr>) -> CompiledExpr,
        fold: fn(f64) -> f64,
    ) -> CompiledExpr {
        match inner {
            CompiledExpr::Const(v) => CompiledExpr::Const(fold(v)),
            other => build(Box::new(other)),
        }
    }

    fn binary(
        a: &Expr,
        b: &Expr,
        table: &SymbolTable,
        build: fn(Box<CompiledExpr>, Box<CompiledExpr>) -> CompiledExpr,
        fold: fn(f64, f64) -> f64,
    ) -> SdeResult<CompiledExpr> {
        let lhs = Self::compile(a, table)?;
        let rhs = Self::compile(b, table)?;
        Ok(match (lhs, rhs) {
            (CompiledExpr::Const(x), CompiledExpr::Const(y)) => CompiledExpr::Const(fold(x, y)),
            (lhs, rhs) => build(Box::new(lhs), Box::new(rhs)),
        })
    }

    /// Evaluate against a slot buffer. Non-finite results are returned as-is;
    /// evaluators decide how to report them.
    pub fn eval(&self, slots: &[f64]) -> f64 {
        match self {
            CompiledExpr::Const(v) => *v,
            CompiledExpr::Slot(i) => slots[*i],
            CompiledExpr::Neg(a) => -a.eval(slots),
            CompiledExpr::Add(a, b) => a.eval(slots) + b.eval(slots),
            CompiledExpr::Sub(a, b) => a.eval(slots) - b.eval(slots),
            CompiledExpr::Mul(a, b) => a.eval(slots) * b.eval(slots),
            CompiledExpr::Div(a, b) => a.eval(slots) / b.eval(slots),
            CompiledExpr::Pow(a, b) => a.eval(slots).powf(b.eval(slots)),
            CompiledExpr::Sqrt(a) => a.eval(slots).sqrt(),
            CompiledExpr::Exp(a) => a.eval(slots).exp(),
            CompiledExpr::Ln(a) => a.eval(slots).ln(),
            CompiledExpr::Sum(terms) => terms.iter().map(|t| t.eval(slots)).sum(),
        }
    }

    /// Highest slot index referenced, if any
    pub fn max_slot(&self) -> Option<usize> {
        match self {
            CompiledExpr::Const(_) => None,
            CompiledExpr::Slot(i) => Some(*i),
            CompiledExpr::Neg(a)
            | CompiledExpr::Sqrt(a)
            | CompiledExpr::Exp(a)
            | CompiledExpr::Ln(a) => a.max_slot(),
            CompiledExpr::Add(a, b)
            | CompiledExpr::Sub(a, b)
            | CompiledExpr::Mul(a, b)
            | CompiledExpr::Div(a, b)
            | CompiledExpr::Pow(a, b) => a.max_slot().max(b.max_slot()),
            CompiledExpr::Sum(terms) => terms.iter().filter_map(|t| t.max_slot()).max(),
        }
    }
}
