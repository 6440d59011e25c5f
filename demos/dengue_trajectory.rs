// demos/dengue_trajectory.rs
use dengue_sde::models::dengue::{DengueModel, DengueParams};
use dengue_sde::models::model::CompartmentModel;
use dengue_sde::output;
use dengue_sde::rng;
use dengue_sde::solvers::{Termination, TimeGrid};

fn report(label: &str, model: &DengueModel, grid: &TimeGrid, seed: u64) -> String {
    let mut rng = rng::seed_rng_from_u64(seed);
    let solution = model.simulate(grid, &mut rng).expect("Dengue simulation");
    let totals = model
        .serotype_totals(&solution)
        .expect("Serotype aggregation");

    println!("{}", label);
    println!("  beta = {:.6}, delta = {}", model.params().beta, model.params().delta);
    println!("  Retained points: {} of {}", solution.len(), grid.len());
    match solution.termination {
        Termination::Completed => println!("  Completed the full horizon"),
        Termination::NegativeState {
            step,
            time,
            component,
            value,
        } => println!(
            "  Stopped: step {} (t = {:.4}) would set {} to {:.2}",
            step,
            time,
            model.compartments()[component],
            value
        ),
    }
    let last = solution.len() - 1;
    println!(
        "  Infectives by serotype at t = {:.3}: [{:.1}, {:.1}, {:.1}, {:.1}]",
        solution.times[last],
        totals[[0, last]],
        totals[[1, last]],
        totals[[2, last]],
        totals[[3, last]]
    );
    println!(
        "  Population: {:.1} -> {:.1}\n",
        solution.state(0).sum(),
        solution.final_state().sum()
    );

    let filename = format!("dengue_{}.csv", seed);
    output::write_trajectory_csv(&filename, model.compartments(), &solution)
        .expect("Could not write trajectory");
    filename
}

fn main() {
    tracing_subscriber::fmt().with_env_filter("debug").init();
    println!("Dengue 4-serotype SDE trajectories\n");

    let grid = TimeGrid::new(0.0, 52.0, 52_000).expect("Valid time grid");

    // propensities are mass action, so the default beta saturates quickly
    let model = DengueModel::new(DengueParams::default()).expect("Valid parameters");
    let first = report("Default parameters", &model, &grid, 1);

    let scaled = DengueParams {
        beta: 400.0 / 52.0 / 50_000.0,
        ..Default::default()
    };
    let model = DengueModel::new(scaled).expect("Valid parameters");
    let second = report("Transmission rate divided by N", &model, &grid, 2);

    println!("Trajectories written to {} and {}", first, second);
}
