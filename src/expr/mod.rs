// src/expr/mod.rs
//! Symbolic model expressions and their compilation to numeric form

pub mod ast;
pub mod compiled;
pub mod parser;

pub use ast::Expr;
pub use compiled::{CompiledExpr, SymbolTable};
pub use parser::parse;
