// src/ensemble.rs
//! Parallel ensembles of vector SDE trajectories
//!
//! Trajectory `i` always draws from `CounterRng(seed, i)`, so an ensemble is
//! bit-identical whatever the size of the rayon pool. Statistics at a time
//! point only cover trajectories that were still alive there; trajectories
//! truncated at the non-negativity boundary drop out of later columns.

use crate::error::{validation::*, SdeError, SdeResult};
use crate::evaluator::Evaluator;
use crate::models::model::CompartmentModel;
use crate::rng::RngFactory;
use crate::solvers::{Solution, TimeGrid, VectorEulerMaruyama};
use bitflags::bitflags;
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use statrs::statistics::Statistics;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnsembleStats: u32 {
        const NONE    = 0;
        const MEAN    = 1 << 0;
        const STD_DEV = 1 << 1;
        const RANGE   = 1 << 2;
    }
}

#[derive(Debug, Clone)]
pub struct EnsembleConfig {
    pub trajectories: usize,
    pub seed: u64,
    pub x_start: f64,
    pub x_finish: f64,
    pub steps: usize,
    pub statistics: EnsembleStats,
}

impl EnsembleConfig {
    pub fn validate(&self) -> SdeResult<()> {
        validate_trajectories(self.trajectories)?;
        self.grid().map(|_| ())
    }

    pub fn grid(&self) -> SdeResult<TimeGrid> {
        TimeGrid::new(self.x_start, self.x_finish, self.steps)
    }
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        EnsembleConfig {
            trajectories: 100,
            seed: 12345,
            x_start: 0.0,
            x_finish: 52.0,
            steps: 5_200,
            statistics: EnsembleStats::MEAN | EnsembleStats::STD_DEV,
        }
    }
}

/// Per-time-point statistics of an ensemble
///
/// Matrices are `n × k` like [`Solution::states`]. Entries are NaN where
/// too few trajectories survive (none for the mean and range, fewer than
/// two for the standard deviation).
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleSummary {
    pub times: Array1<f64>,
    /// Trajectories still alive at each time point
    pub surviving: Vec<usize>,
    /// Trajectories that hit the non-negativity boundary
    pub truncated: usize,
    pub mean: Option<Array2<f64>>,
    pub std_dev: Option<Array2<f64>>,
    pub min: Option<Array2<f64>>,
    pub max: Option<Array2<f64>>,
}

/// Integrate `cfg.trajectories` independent paths in parallel
///
/// Dimension checks run once up front, before any trajectory draws a
/// random number. The first failing trajectory's error is returned.
pub fn run_trajectories<D, B>(
    cfg: &EnsembleConfig,
    y_start: ArrayView1<f64>,
    drift: &D,
    diffusion: &B,
    params: &[f64],
) -> SdeResult<Vec<Solution>>
where
    D: Evaluator<Output = Array1<f64>> + Sync + ?Sized,
    B: Evaluator<Output = Array2<f64>> + Sync + ?Sized,
{
    cfg.validate()?;
    VectorEulerMaruyama::validate(y_start, drift, diffusion, params)?;
    let grid = cfg.grid()?;
    let factory = RngFactory::new(cfg.seed);

    (0..cfg.trajectories)
        .into_par_iter()
        .map(|i| {
            let mut rng = factory.create_counter_rng(i as u64);
            VectorEulerMaruyama::solve(&grid, y_start, drift, diffusion, params, &mut rng)
        })
        .collect()
}

/// Collapse trajectories sharing one time grid into per-point statistics
pub fn summarize(
    grid: &TimeGrid,
    solutions: &[Solution],
    statistics: EnsembleStats,
) -> SdeResult<EnsembleSummary> {
    let n = match solutions.first() {
        Some(s) => s.state_dim(),
        None => {
            return Err(SdeError::InvalidArgument {
                parameter: "solutions".to_string(),
                value: 0.0,
                constraint: "ensemble must contain at least one trajectory".to_string(),
            })
        }
    };
    for s in solutions {
        validate_dimension("ensemble state dimension", n, s.state_dim())?;
        if s.len() > grid.len() {
            return Err(SdeError::DimensionMismatch {
                context: "trajectory length".to_string(),
                expected: grid.len(),
                found: s.len(),
            });
        }
    }

    let k = grid.len();
    let surviving: Vec<usize> = (0..k)
        .map(|t| solutions.iter().filter(|s| s.len() > t).count())
        .collect();
    let truncated = solutions.iter().filter(|s| s.is_truncated()).count();

    let wanted = |flag: EnsembleStats| {
        statistics
            .contains(flag)
            .then(|| Array2::<f64>::zeros((n, k)))
    };
    let mut mean = wanted(EnsembleStats::MEAN);
    let mut std_dev = wanted(EnsembleStats::STD_DEV);
    let mut min = wanted(EnsembleStats::RANGE);
    let mut max = wanted(EnsembleStats::RANGE);

    let mut values = Vec::with_capacity(solutions.len());
    for t in 0..k {
        for i in 0..n {
            values.clear();
            values.extend(
                solutions
                    .iter()
                    .filter(|s| s.len() > t)
                    .map(|s| s.states[[i, t]]),
            );
            if let Some(m) = mean.as_mut() {
                m[[i, t]] = values.iter().mean();
            }
            if let Some(sd) = std_dev.as_mut() {
                sd[[i, t]] = values.iter().std_dev();
            }
            if let (Some(lo), Some(hi)) = (min.as_mut(), max.as_mut()) {
                lo[[i, t]] = Statistics::min(values.iter());
                hi[[i, t]] = Statistics::max(values.iter());
            }
        }
    }

    Ok(EnsembleSummary {
        times: grid.points(k),
        surviving,
        truncated,
        mean,
        std_dev,
        min,
        max,
    })
}

/// Run an ensemble and summarise it
pub fn run_ensemble<D, B>(
    cfg: &EnsembleConfig,
    y_start: ArrayView1<f64>,
    drift: &D,
    diffusion: &B,
    params: &[f64],
) -> SdeResult<EnsembleSummary>
where
    D: Evaluator<Output = Array1<f64>> + Sync + ?Sized,
    B: Evaluator<Output = Array2<f64>> + Sync + ?Sized,
{
    let solutions = run_trajectories(cfg, y_start, drift, diffusion, params)?;
    let summary = summarize(&cfg.grid()?, &solutions, cfg.statistics)?;
    tracing::info!(
        trajectories = cfg.trajectories,
        steps = cfg.steps,
        truncated = summary.truncated,
        surviving_at_end = summary.surviving.last().copied().unwrap_or(0),
        "ensemble finished"
    );
    Ok(summary)
}

/// Compile a compartment model once and run an ensemble from its initial state
pub fn run_model_ensemble<M>(cfg: &EnsembleConfig, model: &M) -> SdeResult<EnsembleSummary>
where
    M: CompartmentModel + ?Sized,
{
    let (drift, diffusion) = model.system().compile()?;
    run_ensemble(
        cfg,
        model.initial_state().view(),
        &drift,
        &diffusion,
        &model.parameter_values(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{NativeMatrix, NativeVector};
    use ndarray::arr1;

    fn growth() -> (
        NativeVector<impl Fn(ArrayView1<f64>, &[f64]) -> Array1<f64>>,
        NativeMatrix<impl Fn(ArrayView1<f64>, &[f64]) -> Array2<f64>>,
    ) {
        let drift = NativeVector::new("growth drift", 1, |y: ArrayView1<f64>, p: &[f64]| {
            arr1(&[(p[0] - p[1]) * y[0]])
        });
        let diffusion = NativeMatrix::new("growth diffusion", 1, 1, |y: ArrayView1<f64>, p: &[f64]| {
            Array2::from_elem((1, 1), ((p[0] + p[1]) * y[0]).max(0.0).sqrt())
        });
        (drift, diffusion)
    }

    fn config(trajectories: usize) -> EnsembleConfig {
        EnsembleConfig {
            trajectories,
            seed: 2024,
            x_start: 0.0,
            x_finish: 10.0,
            steps: 100,
            statistics: EnsembleStats::all(),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(EnsembleConfig::default().validate().is_ok());
        let bad = EnsembleConfig {
            trajectories: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = EnsembleConfig {
            x_finish: -1.0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_independent_of_thread_count() {
        let (drift, diffusion) = growth();
        let cfg = config(64);
        let y0 = arr1(&[100.0]);
        let params = [0.3, 0.27];

        let run = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| run_ensemble(&cfg, y0.view(), &drift, &diffusion, &params).unwrap())
        };
        assert_eq!(run(1), run(4));
    }

    #[test]
    fn test_mean_tracks_exponential_growth() {
        let (drift, diffusion) = growth();
        let cfg = config(2_000);
        let summary =
            run_ensemble(&cfg, arr1(&[100.0]).view(), &drift, &diffusion, &[0.3, 0.27]).unwrap();

        assert_eq!(summary.times.len(), 101);
        assert_eq!(summary.surviving[100] + summary.truncated, 2_000);
        let mean = summary.mean.as_ref().unwrap();
        // Euler mean is 100 (1.003)^100 ≈ 134.9, exact 100 e^0.3 ≈ 135.0
        let expected = 100.0 * 1.003_f64.powi(100);
        assert!(
            (mean[[0, 100]] - expected).abs() < 0.03 * expected,
            "mean {} vs {}",
            mean[[0, 100]],
            expected
        );
        let min = summary.min.as_ref().unwrap();
        let max = summary.max.as_ref().unwrap();
        assert!(min[[0, 100]] <= mean[[0, 100]] && mean[[0, 100]] <= max[[0, 100]]);
        assert_eq!(summary.std_dev.as_ref().unwrap()[[0, 0]], 0.0);
    }

    #[test]
    fn test_truncated_trajectories_drop_out() {
        let drift = NativeVector::new("drain", 1, |_y: ArrayView1<f64>, _p: &[f64]| arr1(&[-1.0]));
        let diffusion = NativeMatrix::new("none", 1, 1, |_y: ArrayView1<f64>, _p: &[f64]| {
            Array2::zeros((1, 1))
        });
        // 0.1 per step from 2.05: the 21st step would go negative
        let cfg = EnsembleConfig {
            statistics: EnsembleStats::MEAN,
            ..config(8)
        };
        let summary =
            run_ensemble(&cfg, arr1(&[2.05]).view(), &drift, &diffusion, &[]).unwrap();

        assert_eq!(summary.truncated, 8);
        assert_eq!(summary.surviving[20], 8);
        assert_eq!(summary.surviving[21], 0);
        let mean = summary.mean.as_ref().unwrap();
        assert!(mean[[0, 21]].is_nan());
        assert!(summary.std_dev.is_none());
        assert!(summary.min.is_none());
    }

    #[test]
    fn test_dimension_errors_before_running() {
        let (drift, diffusion) = growth();
        let result = run_ensemble(
            &config(4),
            arr1(&[1.0, 2.0]).view(),
            &drift,
            &diffusion,
            &[0.3, 0.27],
        );
        assert!(matches!(result, Err(SdeError::DimensionMismatch { .. })));
    }
}
