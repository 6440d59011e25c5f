// src/solvers/grid.rs
use crate::error::{validation::*, SdeError, SdeResult};
use ndarray::Array1;

/// Uniform time grid `x_start = t_0 < t_1 < .. < t_n = x_finish`
///
/// Shared configuration for every solver: the step size
/// `h = (x_finish - x_start) / n_steps` is fixed for the whole run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    x_start: f64,
    x_finish: f64,
    n_steps: usize,
}

impl TimeGrid {
    pub fn new(x_start: f64, x_finish: f64, n_steps: usize) -> SdeResult<Self> {
        validate_finite("x_start", x_start)?;
        validate_finite("x_finish", x_finish)?;
        validate_steps(n_steps)?;
        if x_finish <= x_start {
            return Err(SdeError::InvalidArgument {
                parameter: "x_finish".to_string(),
                value: x_finish,
                constraint: format!("must be greater than x_start ({})", x_start),
            });
        }
        Ok(TimeGrid {
            x_start,
            x_finish,
            n_steps,
        })
    }

    pub fn x_start(&self) -> f64 {
        self.x_start
    }

    pub fn x_finish(&self) -> f64 {
        self.x_finish
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn step_size(&self) -> f64 {
        (self.x_finish - self.x_start) / self.n_steps as f64
    }

    /// Number of grid points, `n_steps + 1`
    pub fn len(&self) -> usize {
        self.n_steps + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The i-th grid point, computed directly rather than accumulated
    pub fn point(&self, i: usize) -> f64 {
        if i == self.n_steps {
            self.x_finish
        } else {
            self.x_start + i as f64 * self.step_size()
        }
    }

    /// The first `len` grid points
    pub fn points(&self, len: usize) -> Array1<f64> {
        Array1::from_shape_fn(len.min(self.len()), |i| self.point(i))
    }
}
