// demos/demo.rs
use dengue_sde::math_utils::Timer;
use dengue_sde::models::birth_death::BirthDeath;
use dengue_sde::output;
use dengue_sde::rng::RngFactory;
use dengue_sde::solvers::{ScalarEulerMaruyama, TimeGrid};
use rayon::prelude::*;

fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();
    println!("Running dengue-sde scalar Euler-Maruyama demo\n");

    let model = BirthDeath::default();
    let y0 = 15.0;
    let t_end = 150.0;
    let steps = 500;
    let paths = 10_000;
    let grid = TimeGrid::new(0.0, t_end, steps).expect("Valid time grid");
    let factory = RngFactory::new(42);

    let mut timer = Timer::new();
    timer.start();
    let finals: Vec<f64> = (0..paths)
        .into_par_iter()
        .map(|i| {
            let mut rng = factory.create_counter_rng(i as u64);
            let (_, ys) = ScalarEulerMaruyama::solve_model(&grid, y0, &model, &mut rng)
                .expect("Scalar solve");
            ys[steps]
        })
        .collect();
    let elapsed = timer.elapsed_ms();

    let mean = finals.iter().sum::<f64>() / paths as f64;
    let h = grid.step_size();
    let euler_mean = y0 * (1.0 + (model.birth - model.death) * h).powi(steps as i32);
    let exact_mean = model.expected_value(y0, t_end);

    println!("Birth-death process dY = (b-d)Y dt + sqrt((b+d)Y) dW");
    println!("  b = {}, d = {}, Y0 = {}, T = {}, h = {}", model.birth, model.death, y0, t_end, h);
    println!("  Paths: {}", paths);
    println!("  Sample mean of Y(T):     {:.3}", mean);
    println!("  Euler-scheme mean:       {:.3}", euler_mean);
    println!("  Exact mean Y0 e^(b-d)T:  {:.3}", exact_mean);
    println!("  Time: {:.2} ms ({:.0} paths/sec)", elapsed, paths as f64 / (elapsed / 1000.0));

    let mut rng = factory.create_counter_rng(0);
    let (xs, ys) =
        ScalarEulerMaruyama::solve_model(&grid, y0, &model, &mut rng).expect("Scalar solve");
    println!("\nSingle path (stream 0):");
    for i in (0..=steps).step_by(100) {
        println!(
            "  t = {:>6.1}  Y = {:>10.3}  exact mean = {:>10.3}",
            xs[i],
            ys[i],
            model.expected_value(y0, xs[i])
        );
    }

    let mean_str = format!("{:.6}", mean);
    let euler_str = format!("{:.6}", euler_mean);
    let exact_str = format!("{:.6}", exact_mean);
    let paths_str = paths.to_string();
    output::write_summary_to_csv(
        "birth_death_summary.csv",
        &[
            ("paths", paths_str.as_str()),
            ("sample_mean", mean_str.as_str()),
            ("euler_mean", euler_str.as_str()),
            ("exact_mean", exact_str.as_str()),
        ],
    )
    .expect("Could not write summary");
    println!("Summary written to birth_death_summary.csv");
}
