// src/solvers/euler_maruyama.rs
//! Euler-Maruyama Scheme for Scalar Ito SDEs
//!
//! # Mathematical Framework
//!
//! For a scalar SDE with fixed parameters θ:
//! ```text
//! dY_t = f(Y_t; θ) dt + g(Y_t; θ) dW_t
//! ```
//!
//! The Euler-Maruyama scheme provides the discretization:
//! ```text
//! Y_{n+1} = Y_n + f(Y_n; θ) h + g(Y_n; θ) √h Z_n
//! ```
//!
//! Where:
//! - `f` is the drift coefficient
//! - `g` is the diffusion coefficient
//! - `Z_n ~ N(0,1)` are drawn fresh and independently at every step
//!
//! # Convergence Properties
//!
//! - **Strong convergence**: Order 0.5 in step size
//! - **Weak convergence**: Order 1.0 in step size
//!
//! The scalar scheme has no boundary policy: it runs the full step budget
//! whatever values the state takes, unless a coefficient evaluates to a
//! non-finite number.

use crate::error::{validation::validate_finite, SdeError, SdeResult};
use crate::models::model::ScalarModel;
use crate::rng;
use crate::solvers::grid::TimeGrid;
use rand::Rng;

/// Euler-Maruyama numerical scheme for scalar SDE integration
pub struct ScalarEulerMaruyama;

impl ScalarEulerMaruyama {
    /// Single Euler-Maruyama step
    ///
    /// # Algorithm
    ///
    /// 1. Generate normal random draw: Z ~ N(0,1)
    /// 2. Compute drift: f(Y_n) * h
    /// 3. Compute diffusion: g(Y_n) * √h * Z
    /// 4. Return Y_n + drift + diffusion
    ///
    /// A non-finite drift or diffusion value is an
    /// [`SdeError::EvaluationFailure`].
    pub fn step<F, G, R>(
        y: f64,
        h: f64,
        drift: &F,
        diffusion: &G,
        params: &[f64],
        rng: &mut R,
    ) -> SdeResult<f64>
    where
        F: Fn(f64, &[f64]) -> f64,
        G: Fn(f64, &[f64]) -> f64,
        R: Rng + ?Sized,
    {
        let normal_draw = rng::get_normal_draw(rng);
        let f = finite("drift", y, drift(y, params))?;
        let g = finite("diffusion", y, diffusion(y, params))?;
        Ok(y + h * f + h.sqrt() * g * normal_draw)
    }

    /// Integrate over the whole grid
    ///
    /// Returns `(times, values)`, both of length `n_steps + 1`.
    pub fn solve<F, G, R>(
        grid: &TimeGrid,
        y_start: f64,
        drift: F,
        diffusion: G,
        params: &[f64],
        rng: &mut R,
    ) -> SdeResult<(Vec<f64>, Vec<f64>)>
    where
        F: Fn(f64, &[f64]) -> f64,
        G: Fn(f64, &[f64]) -> f64,
        R: Rng + ?Sized,
    {
        validate_finite("y_start", y_start)?;
        let h = grid.step_size();
        let mut times = Vec::with_capacity(grid.len());
        let mut values = Vec::with_capacity(grid.len());
        times.push(grid.point(0));
        values.push(y_start);

        let mut y = y_start;
        for i in 1..grid.len() {
            y = Self::step(y, h, &drift, &diffusion, params, rng)?;
            times.push(grid.point(i));
            values.push(y);
        }

        Ok((times, values))
    }

    /// Integrate a [`ScalarModel`] with its own parameter tuple
    pub fn solve_model<M, R>(
        grid: &TimeGrid,
        y_start: f64,
        model: &M,
        rng: &mut R,
    ) -> SdeResult<(Vec<f64>, Vec<f64>)>
    where
        M: ScalarModel + ?Sized,
        R: Rng + ?Sized,
    {
        let params = model.parameters();
        Self::solve(
            grid,
            y_start,
            |y, p: &[f64]| model.drift(y, p),
            |y, p: &[f64]| model.diffusion(y, p),
            &params,
            rng,
        )
    }
}

fn finite(evaluator: &str, y: f64, value: f64) -> SdeResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SdeError::EvaluationFailure {
            evaluator: evaluator.to_string(),
            reason: format!("non-finite value {} at state {}", value, y),
        })
    }
}
