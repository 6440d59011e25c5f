// src/evaluator.rs
//! Numeric evaluators for drift vectors and diffusion matrices
//!
//! The solvers never see how a model was written down. They consume an
//! [`Evaluator`]: something that maps the current state and the fixed
//! parameter tuple to a dense vector (drift) or matrix (diffusion).
//!
//! Two families are provided:
//! - **Native**: closures written directly in Rust ([`NativeVector`],
//!   [`NativeMatrix`]). Fastest; shapes are declared up front.
//! - **Symbolic**: [`Expr`] trees compiled against a [`SymbolTable`]
//!   ([`SymbolicVector`], [`SymbolicMatrix`]). Compilation happens once;
//!   each evaluation walks the compiled tree over a flat slot buffer
//!   `[state.., params..]`.
//!
//! Every evaluation verifies the input lengths, the output shape and that
//! each produced entry is finite.

use crate::error::{validation::validate_dimension, SdeError, SdeResult};
use crate::expr::{CompiledExpr, Expr, SymbolTable};
use ndarray::{Array1, Array2, ArrayView1};
use std::fmt;

/// Output shape of an evaluator; vectors have `cols == 1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn vector(rows: usize) -> Self {
        Shape { rows, cols: 1 }
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.rows, self.cols)
    }
}

/// Maps `(state, params)` to a numeric drift vector or diffusion matrix
pub trait Evaluator {
    type Output;

    /// Label used in error messages
    fn name(&self) -> &str;

    /// Length of the state vector this evaluator accepts
    fn state_dim(&self) -> usize;

    /// Shape of every value returned by [`Evaluator::evaluate`]
    fn shape(&self) -> Shape;

    /// Number of parameters expected, when the evaluator knows it
    fn parameter_count(&self) -> Option<usize>;

    fn evaluate(&self, state: ArrayView1<f64>, params: &[f64]) -> SdeResult<Self::Output>;
}

fn check_inputs<E: Evaluator + ?Sized>(
    evaluator: &E,
    state: &ArrayView1<f64>,
    params: &[f64],
) -> SdeResult<()> {
    validate_dimension(
        &format!("{} state length", evaluator.name()),
        evaluator.state_dim(),
        state.len(),
    )?;
    if let Some(expected) = evaluator.parameter_count() {
        validate_dimension(
            &format!("{} parameter count", evaluator.name()),
            expected,
            params.len(),
        )?;
    }
    Ok(())
}

fn non_finite(name: &str, row: usize, col: Option<usize>, value: f64) -> SdeError {
    let location = match col {
        Some(col) => format!("entry ({}, {})", row, col),
        None => format!("component {}", row),
    };
    SdeError::EvaluationFailure {
        evaluator: name.to_string(),
        reason: format!("{} evaluated to {}", location, value),
    }
}

fn slot_buffer(state: &ArrayView1<f64>, params: &[f64]) -> Vec<f64> {
    let mut slots = Vec::with_capacity(state.len() + params.len());
    slots.extend(state.iter().copied());
    slots.extend_from_slice(params);
    slots
}

/// Drift written as a Rust closure
pub struct NativeVector<F> {
    name: String,
    state_dim: usize,
    parameter_count: Option<usize>,
    f: F,
}

impl<F> NativeVector<F>
where
    F: Fn(ArrayView1<f64>, &[f64]) -> Array1<f64>,
{
    pub fn new(name: &str, state_dim: usize, f: F) -> Self {
        NativeVector {
            name: name.to_string(),
            state_dim,
            parameter_count: None,
            f,
        }
    }

    pub fn with_parameter_count(mut self, count: usize) -> Self {
        self.parameter_count = Some(count);
        self
    }
}

impl<F> Evaluator for NativeVector<F>
where
    F: Fn(ArrayView1<f64>, &[f64]) -> Array1<f64>,
{
    type Output = Array1<f64>;

    fn name(&self) -> &str {
        &self.name
    }

    fn state_dim(&self) -> usize {
        self.state_dim
    }

    fn shape(&self) -> Shape {
        Shape::vector(self.state_dim)
    }

    fn parameter_count(&self) -> Option<usize> {
        self.parameter_count
    }

    fn evaluate(&self, state: ArrayView1<f64>, params: &[f64]) -> SdeResult<Array1<f64>> {
        check_inputs(self, &state, params)?;
        let out = (self.f)(state, params);
        validate_dimension(&format!("{} output length", self.name), self.state_dim, out.len())?;
        if let Some((i, v)) = out.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(non_finite(&self.name, i, None, *v));
        }
        Ok(out)
    }
}

/// Diffusion written as a Rust closure returning an `n × m` matrix
pub struct NativeMatrix<F> {
    name: String,
    shape: Shape,
    parameter_count: Option<usize>,
    f: F,
}

impl<F> NativeMatrix<F>
where
    F: Fn(ArrayView1<f64>, &[f64]) -> Array2<f64>,
{
    pub fn new(name: &str, rows: usize, cols: usize, f: F) -> Self {
        NativeMatrix {
            name: name.to_string(),
            shape: Shape::matrix(rows, cols),
            parameter_count: None,
            f,
        }
    }

    pub fn with_parameter_count(mut self, count: usize) -> Self {
        self.parameter_count = Some(count);
        self
    }
}

impl<F> Evaluator for NativeMatrix<F>
where
    F: Fn(ArrayView1<f64>, &[f64]) -> Array2<f64>,
{
    type Output = Array2<f64>;

    fn name(&self) -> &str {
        &self.name
    }

    fn state_dim(&self) -> usize {
        self.shape.rows
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn parameter_count(&self) -> Option<usize> {
        self.parameter_count
    }

    fn evaluate(&self, state: ArrayView1<f64>, params: &[f64]) -> SdeResult<Array2<f64>> {
        check_inputs(self, &state, params)?;
        let out = (self.f)(state, params);
        let (rows, cols) = out.dim();
        validate_dimension(&format!("{} output rows", self.name), self.shape.rows, rows)?;
        validate_dimension(&format!("{} output columns", self.name), self.shape.cols, cols)?;
        if let Some(((i, j), v)) = out.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(non_finite(&self.name, i, Some(j), *v));
        }
        Ok(out)
    }
}

/// Drift vector compiled from symbolic expressions
#[derive(Debug, Clone)]
pub struct SymbolicVector {
    name: String,
    state_dim: usize,
    parameter_count: usize,
    components: Vec<CompiledExpr>,
}

impl SymbolicVector {
    /// Compile one expression per state component
    pub fn compile(name: &str, exprs: &[Expr], table: &SymbolTable) -> SdeResult<Self> {
        validate_dimension(
            &format!("{} vector length", name),
            table.state_dim(),
            exprs.len(),
        )?;
        let components = exprs
            .iter()
            .map(|e| CompiledExpr::compile(e, table))
            .collect::<SdeResult<Vec<_>>>()?;
        tracing::debug!(evaluator = name, components = components.len(), "compiled drift vector");
        Ok(SymbolicVector {
            name: name.to_string(),
            state_dim: table.state_dim(),
            parameter_count: table.param_count(),
            components,
        })
    }
}

impl Evaluator for SymbolicVector {
    type Output = Array1<f64>;

    fn name(&self) -> &str {
        &self.name
    }

    fn state_dim(&self) -> usize {
        self.state_dim
    }

    fn shape(&self) -> Shape {
        Shape::vector(self.components.len())
    }

    fn parameter_count(&self) -> Option<usize> {
        Some(self.parameter_count)
    }

    fn evaluate(&self, state: ArrayView1<f64>, params: &[f64]) -> SdeResult<Array1<f64>> {
        check_inputs(self, &state, params)?;
        let slots = slot_buffer(&state, params);
        let mut out = Array1::zeros(self.components.len());
        for (i, component) in self.components.iter().enumerate() {
            let v = component.eval(&slots);
            if !v.is_finite() {
                return Err(non_finite(&self.name, i, None, v));
            }
            out[i] = v;
        }
        Ok(out)
    }
}

/// Diffusion matrix compiled from sparse `(row, column, expr)` entries.
/// Entries that are never given are identically zero.
#[derive(Debug, Clone)]
pub struct SymbolicMatrix {
    name: String,
    shape: Shape,
    parameter_count: usize,
    entries: Vec<(usize, usize, CompiledExpr)>,
}

impl SymbolicMatrix {
    pub fn from_triples<I>(
        name: &str,
        rows: usize,
        cols: usize,
        triples: I,
        table: &SymbolTable,
    ) -> SdeResult<Self>
    where
        I: IntoIterator<Item = (usize, usize, Expr)>,
    {
        validate_dimension(&format!("{} rows", name), table.state_dim(), rows)?;
        let mut entries: Vec<(usize, usize, CompiledExpr)> = Vec::new();
        for (i, j, expr) in triples {
            if i >= rows || j >= cols {
                return Err(SdeError::DimensionMismatch {
                    context: format!("{} entry ({}, {}) outside {}", name, i, j, Shape::matrix(rows, cols)),
                    expected: if i >= rows { rows } else { cols },
                    found: if i >= rows { i } else { j },
                });
            }
            if expr.is_zero() {
                continue;
            }
            if entries.iter().any(|(r, c, _)| *r == i && *c == j) {
                return Err(SdeError::CompilationError {
                    reason: format!("{} entry ({}, {}) given more than once", name, i, j),
                });
            }
            entries.push((i, j, CompiledExpr::compile(&expr, table)?));
        }
        tracing::debug!(
            evaluator = name,
            rows,
            cols,
            nonzero = entries.len(),
            "compiled diffusion matrix"
        );
        Ok(SymbolicMatrix {
            name: name.to_string(),
            shape: Shape::matrix(rows, cols),
            parameter_count: table.param_count(),
            entries,
        })
    }

    /// Compile a dense, row-major table of expressions
    pub fn from_rows(name: &str, rows: &[Vec<Expr>], table: &SymbolTable) -> SdeResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        for row in rows {
            validate_dimension(&format!("{} row length", name), cols, row.len())?;
        }
        let triples = rows.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(move |(j, e)| (i, j, e.clone()))
        });
        Self::from_triples(name, rows.len(), cols, triples, table)
    }

    pub fn nonzero_entries(&self) -> usize {
        self.entries.len()
    }
}

impl Evaluator for SymbolicMatrix {
    type Output = Array2<f64>;

    fn name(&self) -> &str {
        &self.name
    }

    fn state_dim(&self) -> usize {
        self.shape.rows
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn parameter_count(&self) -> Option<usize> {
        Some(self.parameter_count)
    }

    fn evaluate(&self, state: ArrayView1<f64>, params: &[f64]) -> SdeResult<Array2<f64>> {
        check_inputs(self, &state, params)?;
        let slots = slot_buffer(&state, params);
        let mut out = Array2::zeros((self.shape.rows, self.shape.cols));
        for (i, j, entry) in &self.entries {
            let v = entry.eval(&slots);
            if !v.is_finite() {
                return Err(non_finite(&self.name, *i, Some(*j), v));
            }
            out[[*i, *j]] = v;
        }
        Ok(out)
    }
}

/// A complete symbolic SDE: ordered state symbols, ordered parameter
/// symbols, one drift expression per state and sparse diffusion entries.
#[derive(Debug, Clone)]
pub struct SymbolicSystem {
    pub state_symbols: Vec<String>,
    pub param_symbols: Vec<String>,
    pub drift: Vec<Expr>,
    pub diffusion_cols: usize,
    pub diffusion: Vec<(usize, usize, Expr)>,
}

impl SymbolicSystem {
    /// Build from a dense row-major diffusion table
    ///
    /// The table must have one row per state symbol, and every row the
    /// same number of columns.
    pub fn new<S: AsRef<str>, P: AsRef<str>>(
        state_symbols: &[S],
        param_symbols: &[P],
        drift: Vec<Expr>,
        diffusion: Vec<Vec<Expr>>,
    ) -> SdeResult<Self> {
        validate_dimension("drift expressions", state_symbols.len(), drift.len())?;
        validate_dimension("diffusion rows", state_symbols.len(), diffusion.len())?;
        let diffusion_cols = diffusion.first().map(|r| r.len()).unwrap_or(0);
        for (i, row) in diffusion.iter().enumerate() {
            validate_dimension(&format!("diffusion row {} columns", i), diffusion_cols, row.len())?;
        }
        let triples = diffusion
            .into_iter()
            .enumerate()
            .flat_map(|(i, row)| row.into_iter().enumerate().map(move |(j, e)| (i, j, e)))
            .collect();
        Ok(SymbolicSystem {
            state_symbols: state_symbols.iter().map(|s| s.as_ref().to_string()).collect(),
            param_symbols: param_symbols.iter().map(|p| p.as_ref().to_string()).collect(),
            drift,
            diffusion_cols,
            diffusion: triples,
        })
    }

    pub fn state_dim(&self) -> usize {
        self.state_symbols.len()
    }

    /// Compile drift and diffusion against one shared symbol table
    pub fn compile(&self) -> SdeResult<(SymbolicVector, SymbolicMatrix)> {
        let table = SymbolTable::new(&self.state_symbols, &self.param_symbols)?;
        let drift = SymbolicVector::compile("drift", &self.drift, &table)?;
        let diffusion = SymbolicMatrix::from_triples(
            "diffusion",
            self.state_symbols.len(),
            self.diffusion_cols,
            self.diffusion.iter().cloned(),
            &table,
        )?;
        Ok((drift, diffusion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;
    use ndarray::{arr1, arr2, Array2};

    fn sir_table() -> SymbolTable {
        SymbolTable::new(&["S", "I", "R"], &["beta", "gamma"]).unwrap()
    }

    #[test]
    fn test_symbolic_vector_matches_closed_form() {
        let table = sir_table();
        let exprs = vec![
            parse("-beta * S * I").unwrap(),
            parse("beta * S * I - gamma * I").unwrap(),
            parse("gamma * I").unwrap(),
        ];
        let drift = SymbolicVector::compile("drift", &exprs, &table).unwrap();
        let native = NativeVector::new("drift", 3, |y: ArrayView1<f64>, p: &[f64]| {
            let inf = p[0] * y[0] * y[1];
            arr1(&[-inf, inf - p[1] * y[1], p[1] * y[1]])
        });

        let state = arr1(&[990.0, 10.0, 0.0]);
        let params = [0.0003, 0.1];
        let a = drift.evaluate(state.view(), &params).unwrap();
        let b = native.evaluate(state.view(), &params).unwrap();
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
        assert_eq!(drift.shape(), Shape::vector(3));
        assert_eq!(drift.parameter_count(), Some(2));
    }

    #[test]
    fn test_symbolic_vector_length_must_match_state() {
        let table = sir_table();
        let exprs = vec![parse("-beta * S * I").unwrap()];
        let result = SymbolicVector::compile("drift", &exprs, &table);
        assert!(matches!(result, Err(SdeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_sparse_matrix_fills_zeros() {
        let table = sir_table();
        let triples = vec![
            (0, 0, parse("-sqrt(beta * S * I)").unwrap()),
            (1, 0, parse("sqrt(beta * S * I)").unwrap()),
            (1, 1, parse("-sqrt(gamma * I)").unwrap()),
            (2, 1, parse("sqrt(gamma * I)").unwrap()),
            (2, 0, Expr::num(0.0)),
        ];
        let b = SymbolicMatrix::from_triples("diffusion", 3, 2, triples, &table).unwrap();
        assert_eq!(b.nonzero_entries(), 4);

        let out = b.evaluate(arr1(&[100.0, 4.0, 0.0]).view(), &[0.01, 0.25]).unwrap();
        let expected = arr2(&[[-2.0, 0.0], [2.0, -1.0], [0.0, 1.0]]);
        for (x, y) in out.iter().zip(expected.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_matrix_rejects_out_of_range_entries() {
        let table = sir_table();
        let triples = vec![(0, 5, parse("S").unwrap())];
        let result = SymbolicMatrix::from_triples("diffusion", 3, 2, triples, &table);
        assert!(matches!(result, Err(SdeError::DimensionMismatch { .. })));

        let rows = vec![vec![Expr::num(1.0)], vec![Expr::num(1.0)]];
        let result = SymbolicMatrix::from_rows("diffusion", &rows, &table);
        assert!(matches!(result, Err(SdeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_from_rows_dense() {
        let table = SymbolTable::new(&["x", "y"], &["k"]).unwrap();
        let rows = vec![
            vec![parse("k * x").unwrap(), Expr::num(0.0)],
            vec![Expr::num(0.0), parse("k * y").unwrap()],
        ];
        let b = SymbolicMatrix::from_rows("diffusion", &rows, &table).unwrap();
        assert_eq!(b.shape(), Shape::matrix(2, 2));
        let out = b.evaluate(arr1(&[2.0, 3.0]).view(), &[0.5]).unwrap();
        assert_eq!(out, arr2(&[[1.0, 0.0], [0.0, 1.5]]));
    }

    #[test]
    fn test_non_finite_values_fail() {
        let table = sir_table();
        let exprs = vec![
            parse("S / R").unwrap(),
            Expr::num(0.0),
            Expr::num(0.0),
        ];
        let drift = SymbolicVector::compile("drift", &exprs, &table).unwrap();
        match drift.evaluate(arr1(&[1.0, 1.0, 0.0]).view(), &[0.1, 0.1]) {
            Err(SdeError::EvaluationFailure { evaluator, reason }) => {
                assert_eq!(evaluator, "drift");
                assert!(reason.contains("component 0"));
            }
            other => panic!("expected evaluation failure, got {:?}", other),
        }

        let native = NativeMatrix::new("diffusion", 1, 1, |y: ArrayView1<f64>, _p: &[f64]| {
            Array2::from_elem((1, 1), (-y[0]).sqrt())
        });
        assert!(matches!(
            native.evaluate(arr1(&[4.0]).view(), &[]),
            Err(SdeError::EvaluationFailure { .. })
        ));
    }

    #[test]
    fn test_input_lengths_checked() {
        let table = sir_table();
        let exprs = vec![Expr::num(0.0), Expr::num(0.0), Expr::num(0.0)];
        let drift = SymbolicVector::compile("drift", &exprs, &table).unwrap();
        assert!(matches!(
            drift.evaluate(arr1(&[1.0, 2.0]).view(), &[0.1, 0.1]),
            Err(SdeError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            drift.evaluate(arr1(&[1.0, 2.0, 3.0]).view(), &[0.1]),
            Err(SdeError::DimensionMismatch { .. })
        ));

        let native = NativeVector::new("drift", 2, |_y: ArrayView1<f64>, _p: &[f64]| arr1(&[1.0]));
        assert!(matches!(
            native.evaluate(arr1(&[1.0, 2.0]).view(), &[]),
            Err(SdeError::DimensionMismatch { .. })
        ));
    }
}
