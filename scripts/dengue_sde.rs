// scripts/dengue_sde.rs
use dengue_sde::ensemble::{run_trajectories, summarize, EnsembleConfig, EnsembleStats};
use dengue_sde::math_utils::Timer;
use dengue_sde::models::dengue::{DengueModel, DengueParams};
use dengue_sde::models::model::CompartmentModel;
use dengue_sde::output::{write_ensemble_csv, write_summary_to_csv, write_trajectory_csv};
use dengue_sde::{SdeError, SdeResult};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: dengue_sde [--trajectories N] [--steps N] [--tf WEEKS] [--seed S]
                  [--beta B] [--delta D] [--out DIR]";

struct Args {
    config: EnsembleConfig,
    params: DengueParams,
    out_dir: PathBuf,
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> SdeResult<T> {
    let raw = value.ok_or_else(|| SdeError::InvalidArgument {
        parameter: flag.to_string(),
        value: f64::NAN,
        constraint: "flag requires a value".to_string(),
    })?;
    raw.parse().map_err(|_| SdeError::InvalidArgument {
        parameter: flag.to_string(),
        value: f64::NAN,
        constraint: format!("could not parse '{}'", raw),
    })
}

fn parse_args() -> SdeResult<Args> {
    let mut args = Args {
        config: EnsembleConfig {
            trajectories: 20,
            x_finish: 1.0,
            steps: 20_000,
            statistics: EnsembleStats::all(),
            ..Default::default()
        },
        params: DengueParams::default(),
        out_dir: PathBuf::from("."),
    };

    let mut it = env::args().skip(1);
    while let Some(flag) = it.next() {
        match flag.as_str() {
            "--trajectories" => args.config.trajectories = parse_value(&flag, it.next())?,
            "--steps" => args.config.steps = parse_value(&flag, it.next())?,
            "--tf" => args.config.x_finish = parse_value(&flag, it.next())?,
            "--seed" => args.config.seed = parse_value(&flag, it.next())?,
            "--beta" => args.params.beta = parse_value(&flag, it.next())?,
            "--delta" => args.params.delta = parse_value(&flag, it.next())?,
            "--out" => args.out_dir = PathBuf::from(parse_value::<String>(&flag, it.next())?),
            "-h" | "--help" => {
                println!("{}", USAGE);
                process::exit(0);
            }
            other => {
                return Err(SdeError::InvalidArgument {
                    parameter: other.to_string(),
                    value: f64::NAN,
                    constraint: "unknown flag".to_string(),
                })
            }
        }
    }
    Ok(args)
}

fn run(args: Args) -> SdeResult<()> {
    let model = DengueModel::new(args.params)?;
    let cfg = args.config;
    cfg.validate()?;

    println!("Dengue 4-serotype SDE ensemble");
    println!("==============================\n");
    println!("System Information:");
    println!("  OS: {}", env::consts::OS);
    println!("  CPU Cores: {}", num_cpus::get());
    println!("  Rayon Threads: {}", rayon::current_num_threads());
    println!();
    println!(
        "Compartments: {}, transitions: {}",
        model.compartments().len(),
        model.network().transitions().len()
    );
    println!(
        "Trajectories: {}, steps: {}, horizon: {} weeks, seed: {}\n",
        cfg.trajectories, cfg.steps, cfg.x_finish, cfg.seed
    );

    let mut timer = Timer::new();
    let (drift, diffusion) = model.system().compile()?;
    let compile_ms = timer.elapsed_ms();

    timer.start();
    let initial = model.initial_state();
    let params = model.parameter_values();
    let solutions = run_trajectories(&cfg, initial.view(), &drift, &diffusion, &params)?;
    let solve_ms = timer.elapsed_ms();

    let grid = cfg.grid()?;
    let summary = summarize(&grid, &solutions, cfg.statistics)?;

    println!("{:=<60}", "");
    println!("{:<30} {:>12.2}", "Compile time (ms)", compile_ms);
    println!("{:<30} {:>12.2}", "Solve time (ms)", solve_ms);
    println!(
        "{:<30} {:>12}",
        "Truncated trajectories", summary.truncated
    );
    for (i, s) in solutions.iter().enumerate().take(5) {
        println!(
            "  trajectory {:>3}: {} points, {:?}",
            i,
            s.len(),
            s.termination
        );
    }
    println!("{:=<60}", "");

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let names = model.compartments();
    let ensemble_file = args.out_dir.join(format!("dengue_ensemble_{}.csv", timestamp));
    write_ensemble_csv(&ensemble_file, names, &summary)?;

    let trajectory_file = args.out_dir.join(format!("dengue_trajectory_{}.csv", timestamp));
    if let Some(first) = solutions.first() {
        write_trajectory_csv(&trajectory_file, names, first)?;
    }

    let summary_file = args.out_dir.join(format!("dengue_run_{}.csv", timestamp));
    let generated = chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string();
    let trajectories = cfg.trajectories.to_string();
    let steps = cfg.steps.to_string();
    let horizon = cfg.x_finish.to_string();
    let seed = cfg.seed.to_string();
    let truncated = summary.truncated.to_string();
    let solve_time = format!("{:.2}", solve_ms);
    write_summary_to_csv(
        &summary_file,
        &[
            ("generated", generated.as_str()),
            ("trajectories", trajectories.as_str()),
            ("steps", steps.as_str()),
            ("horizon_weeks", horizon.as_str()),
            ("seed", seed.as_str()),
            ("truncated", truncated.as_str()),
            ("solve_ms", solve_time.as_str()),
        ],
    )?;

    println!("\nResults saved to:");
    println!("  {}", ensemble_file.display());
    println!("  {}", trajectory_file.display());
    println!("  {}", summary_file.display());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let result = parse_args().and_then(run);
    if let Err(e) = result {
        eprintln!("error: {}", e);
        eprintln!("{}", USAGE);
        process::exit(1);
    }
}
