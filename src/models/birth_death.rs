// src/models/birth_death.rs
//! Linear birth-death process in its diffusion approximation
//!
//! ```text
//! dY = (b − d) Y dt + √((b + d) Y) dW
//! ```
//!
//! The mean follows E[Y_t] = Y_0 e^{(b−d)t} exactly, which makes it a
//! convenient check for the scalar solver.

use crate::error::{validation::*, SdeResult};
use crate::models::model::ScalarModel;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BirthDeath {
    pub birth: f64,
    pub death: f64,
}

impl Default for BirthDeath {
    fn default() -> Self {
        Self {
            birth: 0.3,
            death: 0.27,
        }
    }
}

impl BirthDeath {
    pub fn new(birth: f64, death: f64) -> SdeResult<Self> {
        validate_non_negative("birth", birth)?;
        validate_non_negative("death", death)?;
        Ok(Self { birth, death })
    }

    pub fn expected_value(&self, y0: f64, t: f64) -> f64 {
        y0 * ((self.birth - self.death) * t).exp()
    }

    /// Rates from `params`, falling back to the model's own for missing entries
    fn rates(&self, params: &[f64]) -> (f64, f64) {
        (
            params.first().copied().unwrap_or(self.birth),
            params.get(1).copied().unwrap_or(self.death),
        )
    }
}

impl ScalarModel for BirthDeath {
    fn parameters(&self) -> Vec<f64> {
        vec![self.birth, self.death]
    }

    fn drift(&self, y: f64, params: &[f64]) -> f64 {
        let (b, d) = self.rates(params);
        (b - d) * y
    }

    fn diffusion(&self, y: f64, params: &[f64]) -> f64 {
        let (b, d) = self.rates(params);
        // extinct populations stay quiet
        ((b + d) * y).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solvers::{ScalarEulerMaruyama, TimeGrid};
    use crate::rng::seed_rng_from_u64;

    #[test]
    fn test_coefficients() {
        let model = BirthDeath::default();
        let p = model.parameters();
        assert!((model.drift(10.0, &p) - 0.3).abs() < 1e-12);
        assert!((model.diffusion(10.0, &p) - 5.7_f64.sqrt()).abs() < 1e-12);
        assert_eq!(model.diffusion(-1.0, &p), 0.0);
    }

    #[test]
    fn test_short_parameter_slice_uses_model_rates() {
        let model = BirthDeath::new(0.5, 0.2).unwrap();
        assert!((model.drift(10.0, &[]) - 3.0).abs() < 1e-12);
        assert!((model.diffusion(10.0, &[0.6]) - 8.0_f64.sqrt()).abs() < 1e-12);

        let grid = TimeGrid::new(0.0, 1.0, 10).unwrap();
        let mut rng = seed_rng_from_u64(8);
        let (_, ys) = ScalarEulerMaruyama::solve(
            &grid,
            10.0,
            |y, p: &[f64]| model.drift(y, p),
            |y, p: &[f64]| model.diffusion(y, p),
            &[],
            &mut rng,
        )
        .unwrap();
        assert_eq!(ys.len(), 11);
    }

    #[test]
    fn test_expected_value() {
        let model = BirthDeath::default();
        assert_eq!(model.expected_value(15.0, 0.0), 15.0);
        assert!((model.expected_value(15.0, 150.0) - 15.0 * 4.5_f64.exp()).abs() < 1e-9);
        assert!(BirthDeath::new(-0.1, 0.2).is_err());
    }

    #[test]
    fn test_single_path_runs_full_grid() {
        let model = BirthDeath::default();
        let grid = TimeGrid::new(0.0, 150.0, 500).unwrap();
        let mut rng = seed_rng_from_u64(15);
        let (xs, ys) = ScalarEulerMaruyama::solve_model(&grid, 15.0, &model, &mut rng).unwrap();
        assert_eq!(xs.len(), 501);
        assert_eq!(ys.len(), 501);
        assert!(ys.iter().all(|y| y.is_finite()));
    }
}
