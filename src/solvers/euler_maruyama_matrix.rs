// src/solvers/euler_maruyama_matrix.rs
//! Euler-Maruyama Scheme for Vector Ito SDEs in Matrix Form
//!
//! # Mathematical Framework
//!
//! For an n-dimensional state driven by m independent Wiener processes:
//! ```text
//! dX_t = μ(X_t; θ) dt + B(X_t; θ) dW_t,     μ: ℝⁿ → ℝⁿ,  B: ℝⁿ → ℝⁿˣᵐ
//! ```
//!
//! Each step draws a fresh column ΔW ~ N(0, h·I_m) and applies:
//! ```text
//! X_{k+1} = X_k + h μ(X_k; θ) + B(X_k; θ) ΔW_k
//! ```
//!
//! In the compartmental models this crate targets, column j of B is the
//! state change of elementary event j scaled by the square root of its
//! propensity (chemical Langevin form), so m is the number of event types.
//!
//! # Boundary Policy
//!
//! Compartments hold population counts. A step that would make any
//! component negative signals that the diffusion approximation has broken
//! down: the offending state is discarded and the trajectory ends at the
//! last valid state. This is a successful, shorter result reported through
//! [`Termination::NegativeState`], not an error.
//!
//! # Failure Modes
//!
//! - Shape inconsistencies are rejected before any random number is drawn
//! - Evaluation failures abort the call at the step where they occur

use crate::error::{validation::*, SdeError, SdeResult};
use crate::evaluator::{Evaluator, SymbolicSystem};
use crate::rng;
use crate::solvers::grid::TimeGrid;
use crate::solvers::solution::{Solution, Termination};
use ndarray::{s, Array1, Array2, ArrayView1};
use rand::Rng;

/// Matrix-form Euler-Maruyama integrator
pub struct VectorEulerMaruyama;

impl VectorEulerMaruyama {
    /// Check that state, drift, diffusion and parameters agree on their
    /// dimensions. Returns the number of Wiener increments per step.
    pub fn validate<D, B>(
        y_start: ArrayView1<f64>,
        drift: &D,
        diffusion: &B,
        params: &[f64],
    ) -> SdeResult<usize>
    where
        D: Evaluator<Output = Array1<f64>> + ?Sized,
        B: Evaluator<Output = Array2<f64>> + ?Sized,
    {
        let n = y_start.len();
        if n == 0 {
            return Err(SdeError::InvalidArgument {
                parameter: "y_start".to_string(),
                value: 0.0,
                constraint: "state vector must have at least one component".to_string(),
            });
        }

        validate_dimension("drift state length", n, drift.state_dim())?;
        validate_dimension("drift vector length", n, drift.shape().rows)?;
        validate_dimension("drift vector columns", 1, drift.shape().cols)?;
        validate_dimension("diffusion state length", n, diffusion.state_dim())?;
        validate_dimension("diffusion matrix rows", n, diffusion.shape().rows)?;
        if let Some(expected) = drift.parameter_count() {
            validate_dimension("drift parameter count", expected, params.len())?;
        }
        if let Some(expected) = diffusion.parameter_count() {
            validate_dimension("diffusion parameter count", expected, params.len())?;
        }

        for (i, &y) in y_start.iter().enumerate() {
            let name = format!("y_start[{}]", i);
            validate_finite(&name, y)?;
            validate_non_negative(&name, y)?;
        }
        for (k, &p) in params.iter().enumerate() {
            validate_finite(&format!("params[{}]", k), p)?;
        }

        Ok(diffusion.shape().cols)
    }

    /// One step from `state`, returning a freshly allocated next state
    ///
    /// # Algorithm
    ///
    /// 1. Draw ΔW: m i.i.d. N(0,1) samples scaled by √h
    /// 2. Evaluate drift μ(X_k) → n-vector
    /// 3. Evaluate diffusion B(X_k) → n×m matrix
    /// 4. Return X_k + h μ + B ΔW
    pub fn step<D, B, R>(
        state: ArrayView1<f64>,
        h: f64,
        drift: &D,
        diffusion: &B,
        params: &[f64],
        rng: &mut R,
    ) -> SdeResult<Array1<f64>>
    where
        D: Evaluator<Output = Array1<f64>> + ?Sized,
        B: Evaluator<Output = Array2<f64>> + ?Sized,
        R: Rng + ?Sized,
    {
        let dw = rng::wiener_increments(rng, diffusion.shape().cols, h.sqrt());
        let mu = drift.evaluate(state, params)?;
        let b = diffusion.evaluate(state, params)?;
        let noise = b.dot(&dw);
        Ok(&state + &(mu * h) + &noise)
    }

    /// Integrate from `y_start` over `grid`
    ///
    /// Returns the full `n × (n_steps + 1)` trajectory, or the valid prefix
    /// when a step would leave the non-negative orthant.
    pub fn solve<D, B, R>(
        grid: &TimeGrid,
        y_start: ArrayView1<f64>,
        drift: &D,
        diffusion: &B,
        params: &[f64],
        rng: &mut R,
    ) -> SdeResult<Solution>
    where
        D: Evaluator<Output = Array1<f64>> + ?Sized,
        B: Evaluator<Output = Array2<f64>> + ?Sized,
        R: Rng + ?Sized,
    {
        Self::validate(y_start, drift, diffusion, params)?;

        let h = grid.step_size();
        let mut states = Array2::zeros((y_start.len(), grid.len()));
        states.column_mut(0).assign(&y_start);

        let mut retained = 1;
        let mut termination = Termination::Completed;
        for step in 1..grid.len() {
            let next = Self::step(states.column(step - 1), h, drift, diffusion, params, rng)?;
            if let Some((component, &value)) = next.iter().enumerate().find(|(_, v)| **v < 0.0) {
                let time = grid.point(step);
                tracing::debug!(
                    step,
                    time,
                    component,
                    value,
                    "negative state component, truncating trajectory"
                );
                termination = Termination::NegativeState {
                    step,
                    time,
                    component,
                    value,
                };
                break;
            }
            states.column_mut(step).assign(&next);
            retained += 1;
        }

        Ok(Solution {
            times: grid.points(retained),
            states: states.slice(s![.., ..retained]).to_owned(),
            termination,
        })
    }

    /// Compile a symbolic system once, then integrate it
    ///
    /// `params` must follow the order of `system.param_symbols`.
    pub fn solve_symbolic<R>(
        grid: &TimeGrid,
        y_start: ArrayView1<f64>,
        system: &SymbolicSystem,
        params: &[f64],
        rng: &mut R,
    ) -> SdeResult<Solution>
    where
        R: Rng + ?Sized,
    {
        validate_dimension("state symbols", y_start.len(), system.state_dim())?;
        let (drift, diffusion) = system.compile()?;
        Self::solve(grid, y_start, &drift, &diffusion, params, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{NativeMatrix, NativeVector};
    use crate::expr::{parse, Expr};
    use crate::rng::seed_rng_from_u64;
    use ndarray::arr1;

    fn decay_system() -> SymbolicSystem {
        SymbolicSystem::new(
            &["x", "y"],
            &["k"],
            vec![parse("-k * x").unwrap(), parse("k * x").unwrap()],
            vec![
                vec![parse("-sqrt(k * x)").unwrap()],
                vec![parse("sqrt(k * x)").unwrap()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_full_length_and_time_grid() {
        let grid = TimeGrid::new(0.0, 5.0, 50).unwrap();
        let mut rng = seed_rng_from_u64(4);
        let sol = VectorEulerMaruyama::solve_symbolic(
            &grid,
            arr1(&[1000.0, 100.0]).view(),
            &decay_system(),
            &[0.1],
            &mut rng,
        )
        .unwrap();

        assert_eq!(sol.termination, Termination::Completed);
        assert_eq!(sol.len(), 51);
        assert_eq!(sol.states.dim(), (2, 51));
        for w in sol.times.windows(2) {
            assert!((w[1] - w[0] - 0.1).abs() < 1e-12);
        }
        // mass is conserved by every column of B and by the drift
        for k in 0..sol.len() {
            let total = sol.state(k).sum();
            assert!((total - 1100.0).abs() < 1e-8, "total at {} = {}", k, total);
        }
    }

    #[test]
    fn test_step_does_not_mutate_input() {
        let state = arr1(&[10.0, 0.0]);
        let drift = NativeVector::new("drift", 2, |y: ArrayView1<f64>, _p: &[f64]| {
            arr1(&[-y[0], y[0]])
        });
        let diffusion = NativeMatrix::new("diffusion", 2, 1, |_y: ArrayView1<f64>, _p: &[f64]| {
            Array2::from_elem((2, 1), 1.0)
        });
        let mut rng = seed_rng_from_u64(5);
        let next =
            VectorEulerMaruyama::step(state.view(), 0.1, &drift, &diffusion, &[], &mut rng)
                .unwrap();
        assert_eq!(state, arr1(&[10.0, 0.0]));
        assert_ne!(next, state);
    }

    #[test]
    fn test_negative_initial_state_rejected() {
        let grid = TimeGrid::new(0.0, 1.0, 10).unwrap();
        let mut rng = seed_rng_from_u64(6);
        let result = VectorEulerMaruyama::solve_symbolic(
            &grid,
            arr1(&[-1.0, 0.0]).view(),
            &decay_system(),
            &[0.1],
            &mut rng,
        );
        assert!(matches!(result, Err(SdeError::InvalidArgument { .. })));
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let grid = TimeGrid::new(0.0, 1.0, 10).unwrap();
        let mut rng = seed_rng_from_u64(7);
        let result = VectorEulerMaruyama::solve_symbolic(
            &grid,
            arr1(&[1.0, 0.0]).view(),
            &decay_system(),
            &[0.1, 0.2],
            &mut rng,
        );
        assert!(matches!(result, Err(SdeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_state_symbols_must_match_initial_state() {
        let grid = TimeGrid::new(0.0, 1.0, 10).unwrap();
        let mut rng = seed_rng_from_u64(8);
        let result = VectorEulerMaruyama::solve_symbolic(
            &grid,
            arr1(&[1.0, 0.0, 3.0]).view(),
            &decay_system(),
            &[0.1],
            &mut rng,
        );
        assert!(matches!(result, Err(SdeError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_evaluation_failure_propagates() {
        let system = SymbolicSystem::new(
            &["x"],
            &["k"],
            vec![parse("-k + 0 * sqrt(x - 0.45)").unwrap()],
            vec![vec![Expr::num(0.0)]],
        )
        .unwrap();
        let grid = TimeGrid::new(0.0, 1.0, 10).unwrap();
        let mut rng = seed_rng_from_u64(9);
        // x falls by 0.1 per step and the drift turns NaN once x < 0.45
        let result = VectorEulerMaruyama::solve_symbolic(
            &grid,
            arr1(&[1.0]).view(),
            &system,
            &[1.0],
            &mut rng,
        );
        assert!(matches!(result, Err(SdeError::EvaluationFailure { .. })));
    }
}
