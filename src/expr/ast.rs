// src/expr/ast.rs
//! Arithmetic expression trees
//!
//! Models are written as [`Expr`] values, either built in code with the
//! overloaded operators or parsed from text with [`super::parse`]:
//!
//! ```rust
//! use dengue_sde::expr::Expr;
//!
//! let beta = Expr::sym("beta");
//! let s = Expr::sym("S");
//! let i = Expr::sym("I");
//! let infection = beta * s * i;
//! assert_eq!(infection.to_string(), "beta * S * I");
//! ```

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Immutable arithmetic expression over named symbols
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Sym(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Sqrt(Box<Expr>),
    Exp(Box<Expr>),
    Ln(Box<Expr>),
    Sum(Vec<Expr>),
}

impl Expr {
    pub fn num(value: f64) -> Self {
        Expr::Num(value)
    }

    pub fn sym(name: &str) -> Self {
        Expr::Sym(name.to_string())
    }

    /// n-ary sum; an empty sum is the constant 0
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Self {
        let mut terms: Vec<Expr> = terms.into_iter().collect();
        match terms.len() {
            0 => Expr::Num(0.0),
            1 => terms.remove(0),
            _ => Expr::Sum(terms),
        }
    }

    pub fn sqrt(self) -> Self {
        Expr::Sqrt(Box::new(self))
    }

    pub fn exp(self) -> Self {
        Expr::Exp(Box::new(self))
    }

    pub fn ln(self) -> Self {
        Expr::Ln(Box::new(self))
    }

    pub fn pow(self, exponent: Expr) -> Self {
        Expr::Pow(Box::new(self), Box::new(exponent))
    }

    /// `c * self`, skipping the multiplication for ±1
    pub fn scaled(self, c: f64) -> Self {
        if c == 1.0 {
            self
        } else if c == -1.0 {
            -self
        } else {
            Expr::Num(c) * self
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Num(v) if *v == 0.0)
    }

    /// Every distinct symbol name, in first-appearance order
    pub fn symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut Vec<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(name) => {
                if !out.iter().any(|s| s == name) {
                    out.push(name.clone());
                }
            }
            Expr::Neg(a) | Expr::Sqrt(a) | Expr::Exp(a) | Expr::Ln(a) => a.collect_symbols(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
            Expr::Sum(terms) => {
                for term in terms {
                    term.collect_symbols(out);
                }
            }
        }
    }

    // Binding strength used by Display to decide on parentheses.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) | Expr::Sum(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(..) => 3,
            Expr::Pow(..) => 4,
            Expr::Num(v) if *v < 0.0 => 3,
            _ => 5,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{}", v),
            Expr::Sym(name) => write!(f, "{}", name),
            Expr::Neg(a) => {
                write!(f, "-")?;
                a.fmt_operand(f, 4)
            }
            Expr::Add(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " + ")?;
                b.fmt_operand(f, 2)
            }
            Expr::Sub(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " - ")?;
                b.fmt_operand(f, 2)
            }
            Expr::Mul(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, " * ")?;
                b.fmt_operand(f, 3)
            }
            Expr::Div(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, " / ")?;
                b.fmt_operand(f, 3)
            }
            Expr::Pow(a, b) => {
                a.fmt_operand(f, 5)?;
                write!(f, "^")?;
                b.fmt_operand(f, 4)
            }
            Expr::Sqrt(a) => write!(f, "sqrt({})", a),
            Expr::Exp(a) => write!(f, "exp({})", a),
            Expr::Ln(a) => write!(f, "ln({})", a),
            Expr::Sum(terms) => {
                for (k, term) in terms.iter().enumerate() {
                    if k > 0 {
                        write!(f, " + ")?;
                    }
                    term.fmt_operand(f, 2)?;
                }
                Ok(())
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Num(value)
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::sym(name)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Neg(Box::new(self))
    }
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $variant:ident) => {
        impl $trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(Box::new(self), Box::new(rhs))
            }
        }

        impl $trait<f64> for Expr {
            type Output = Expr;

            fn $method(self, rhs: f64) -> Expr {
                Expr::$variant(Box::new(self), Box::new(Expr::Num(rhs)))
            }
        }

        impl $trait<Expr> for f64 {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::$variant(Box::new(Expr::Num(self)), Box::new(rhs))
            }
        }
    };
}

impl_binary_op!(Add, add, Add);
impl_binary_op!(Sub, sub, Sub);
impl_binary_op!(Mul, mul, Mul);
impl_binary_op!(Div, div, Div);
