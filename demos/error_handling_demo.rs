// demos/error_handling_demo.rs
use dengue_sde::ensemble::{run_ensemble, EnsembleConfig};
use dengue_sde::error::SdeError;
use dengue_sde::evaluator::{NativeMatrix, NativeVector, SymbolicSystem};
use dengue_sde::expr::parse;
use dengue_sde::models::dengue::{DengueModel, DengueParams};
use dengue_sde::rng::seed_rng_from_u64;
use dengue_sde::solvers::{TimeGrid, VectorEulerMaruyama};
use ndarray::{arr1, Array2, ArrayView1};

fn show<T>(result: Result<T, SdeError>) {
    match result {
        Ok(_) => println!("   Unexpected: Should have failed!"),
        Err(e) => println!("   ✓ Caught error: {}", e),
    }
}

fn main() {
    println!("Error Handling Demo for dengue-sde");
    println!("==================================\n");

    println!("1. Testing a time grid with zero steps...");
    show(TimeGrid::new(0.0, 1.0, 0));

    println!("\n2. Testing a malformed drift expression...");
    show(parse("beta * (S + "));

    println!("\n3. Testing an expression with an undeclared symbol...");
    let system = SymbolicSystem::new(
        &["S"],
        &["beta"],
        vec![parse("-beta * S * I").expect("Valid expression")],
        vec![vec![parse("sqrt(beta * S)").expect("Valid expression")]],
    )
    .expect("Valid table shape");
    show(system.compile());

    println!("\n4. Testing a diffusion matrix with the wrong number of rows...");
    let drift = NativeVector::new("drift", 2, |y: ArrayView1<f64>, _p: &[f64]| arr1(&[-y[0], y[0]]));
    let diffusion = NativeMatrix::new("diffusion", 3, 1, |_y: ArrayView1<f64>, _p: &[f64]| {
        Array2::zeros((3, 1))
    });
    let grid = TimeGrid::new(0.0, 1.0, 10).expect("Valid time grid");
    let mut rng = seed_rng_from_u64(42);
    show(VectorEulerMaruyama::solve(
        &grid,
        arr1(&[1.0, 0.0]).view(),
        &drift,
        &diffusion,
        &[],
        &mut rng,
    ));

    println!("\n5. Testing a negative initial population...");
    let model = DengueModel::new(DengueParams::default()).expect("Valid parameters");
    show(model.initial_state_from(&[("S", -10.0)]));

    println!("\n6. Testing out-of-range cross-immunity...");
    show(DengueModel::new(DengueParams {
        delta: 1.2,
        ..Default::default()
    }));

    println!("\n7. Testing an ensemble with zero trajectories...");
    let cfg = EnsembleConfig {
        trajectories: 0,
        ..Default::default()
    };
    let diffusion = NativeMatrix::new("diffusion", 2, 1, |_y: ArrayView1<f64>, _p: &[f64]| {
        Array2::zeros((2, 1))
    });
    show(run_ensemble(&cfg, arr1(&[1.0, 0.0]).view(), &drift, &diffusion, &[]));

    println!("\n8. Testing a state that leaves the non-negative orthant (not an error)...");
    let drain = NativeVector::new("drain", 1, |_y: ArrayView1<f64>, _p: &[f64]| arr1(&[-5.0]));
    let quiet = NativeMatrix::new("quiet", 1, 1, |_y: ArrayView1<f64>, _p: &[f64]| {
        Array2::zeros((1, 1))
    });
    match VectorEulerMaruyama::solve(&grid, arr1(&[1.2]).view(), &drain, &quiet, &[], &mut rng) {
        Ok(solution) => println!(
            "   ✓ Trajectory kept {} of {} points: {:?}",
            solution.len(),
            grid.len(),
            solution.termination
        ),
        Err(e) => println!("   Error: {}", e),
    }

    println!("\nError handling demo completed!");
}
