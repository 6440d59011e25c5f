// src/models/model.rs
use crate::error::SdeResult;
use crate::evaluator::SymbolicSystem;
use crate::solvers::{Solution, TimeGrid, VectorEulerMaruyama};
use ndarray::Array1;
use rand::Rng;

/// Scalar SDE `dY = f(Y; θ) dt + g(Y; θ) dW` with its own parameter tuple
pub trait ScalarModel {
    fn parameters(&self) -> Vec<f64>;
    fn drift(&self, y: f64, params: &[f64]) -> f64;
    fn diffusion(&self, y: f64, params: &[f64]) -> f64;
}

/// Compartmental model that can be written as a symbolic vector SDE
pub trait CompartmentModel {
    /// Compartment names, index-aligned with the state vector
    fn compartments(&self) -> &[String];

    /// Parameter values, in the order of the system's parameter symbols
    fn parameter_values(&self) -> Vec<f64>;

    fn initial_state(&self) -> Array1<f64>;

    fn system(&self) -> SymbolicSystem;

    /// Compile the system and integrate one trajectory from the initial state
    fn simulate<R: Rng + ?Sized>(&self, grid: &TimeGrid, rng: &mut R) -> SdeResult<Solution>
    where
        Self: Sized,
    {
        VectorEulerMaruyama::solve_symbolic(
            grid,
            self.initial_state().view(),
            &self.system(),
            &self.parameter_values(),
            rng,
        )
    }
}
