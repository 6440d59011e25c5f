// tests/dengue_test.rs
use dengue_sde::ensemble::{run_model_ensemble, EnsembleConfig, EnsembleStats};
use dengue_sde::evaluator::Evaluator;
use dengue_sde::models::dengue::{DengueModel, DengueParams, COMPARTMENTS};
use dengue_sde::models::model::CompartmentModel;
use dengue_sde::rng;
use dengue_sde::solvers::{Termination, TimeGrid};

#[test]
fn test_dengue_trajectory_respects_boundary() {
    let model = DengueModel::new(DengueParams::default()).unwrap();
    let grid = TimeGrid::new(0.0, 0.01, 100).unwrap();

    for seed in 0..5 {
        let mut rng = rng::seed_rng_from_u64(seed);
        let sol = model.simulate(&grid, &mut rng).unwrap();

        assert_eq!(sol.state_dim(), 48);
        assert!(sol.len() >= 1 && sol.len() <= 101);
        assert_eq!(sol.state(0).sum(), 50_000.0);
        assert!(sol.states.iter().all(|v| *v >= 0.0 && v.is_finite()));
        if let Termination::NegativeState { step, component, .. } = sol.termination {
            assert_eq!(step, sol.len());
            assert!(component < COMPARTMENTS.len());
        }

        let totals = model.serotype_totals(&sol).unwrap();
        assert_eq!(totals.dim(), (4, sol.len()));
        for k in 0..4 {
            assert_eq!(totals[[k, 0]], 500.0);
        }
    }
}

#[test]
fn test_dengue_diffusion_covariance_is_positive_semidefinite_on_diagonal() {
    let model = DengueModel::new(DengueParams::default()).unwrap();
    let (_, diffusion) = model.system().compile().unwrap();
    let state = model
        .initial_state_from(&[
            ("S", 30_000.0),
            ("I_1", 400.0),
            ("R_2", 5_000.0),
            ("I_21", 50.0),
            ("R_123", 900.0),
        ])
        .unwrap();
    let b = diffusion
        .evaluate(state.view(), &model.parameter_values())
        .unwrap();
    let cov = b.dot(&b.t());
    for i in 0..48 {
        assert!(cov[[i, i]] >= 0.0);
    }
    // S only loses hosts to primary infection and death, and gains births
    let p = DengueParams::default();
    let lambda_1 = 400.0 + 50.0;
    let expected = p.beta * 30_000.0 * lambda_1 + p.mu * 30_000.0 + p.mu * p.population;
    assert!((cov[[0, 0]] - expected).abs() < 1e-6 * expected);
}

#[test]
fn test_dengue_ensemble_is_reproducible() {
    let params = DengueParams {
        beta: 400.0 / 52.0 / 50_000.0,
        ..Default::default()
    };
    let model = DengueModel::new(params).unwrap();
    let cfg = EnsembleConfig {
        trajectories: 8,
        seed: 99,
        x_start: 0.0,
        x_finish: 0.5,
        steps: 500,
        statistics: EnsembleStats::MEAN | EnsembleStats::RANGE,
    };

    let first = run_model_ensemble(&cfg, &model).unwrap();
    let second = run_model_ensemble(&cfg, &model).unwrap();
    assert_eq!(first.surviving, second.surviving);
    assert_eq!(first.truncated, second.truncated);
    assert_eq!(first.surviving[0], 8);
    assert!(first.surviving.windows(2).all(|w| w[1] <= w[0]));

    let mean = first.mean.as_ref().unwrap();
    assert_eq!(mean.dim(), (48, 501));
    assert_eq!(mean[[0, 0]], 48_000.0);
    assert!(first.std_dev.is_none());
}
