// src/output.rs
use crate::ensemble::EnsembleSummary;
use crate::error::{validation::validate_dimension, SdeError, SdeResult};
use crate::solvers::Solution;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

fn io_error(path: &Path, err: io::Error) -> SdeError {
    SdeError::Io {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
}

fn create(path: &Path) -> SdeResult<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| io_error(path, e))
}

/// One row per retained time point: `time,<names...>`
pub fn write_trajectory_csv<P, S>(path: P, names: &[S], solution: &Solution) -> SdeResult<()>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    validate_dimension("column names", solution.state_dim(), names.len())?;
    let mut file = create(path)?;
    let body = |file: &mut BufWriter<File>| -> io::Result<()> {
        write!(file, "time")?;
        for name in names {
            write!(file, ",{}", name.as_ref())?;
        }
        writeln!(file)?;
        for (k, t) in solution.times.iter().enumerate() {
            write!(file, "{}", t)?;
            for v in solution.state(k) {
                write!(file, ",{}", v)?;
            }
            writeln!(file)?;
        }
        file.flush()
    };
    body(&mut file).map_err(|e| io_error(path, e))
}

/// Long format: `time,surviving,compartment,mean,std_dev,min,max`
///
/// Statistics that were not requested are left empty.
pub fn write_ensemble_csv<P, S>(path: P, names: &[S], summary: &EnsembleSummary) -> SdeResult<()>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let path = path.as_ref();
    let n = summary
        .mean
        .as_ref()
        .or(summary.std_dev.as_ref())
        .or(summary.min.as_ref())
        .map_or(names.len(), |m| m.nrows());
    validate_dimension("column names", n, names.len())?;

    let cell = |m: &Option<ndarray::Array2<f64>>, i: usize, k: usize| {
        m.as_ref().map(|m| m[[i, k]].to_string()).unwrap_or_default()
    };
    let mut file = create(path)?;
    let body = |file: &mut BufWriter<File>| -> io::Result<()> {
        writeln!(file, "time,surviving,compartment,mean,std_dev,min,max")?;
        for (k, t) in summary.times.iter().enumerate() {
            for (i, name) in names.iter().enumerate() {
                writeln!(
                    file,
                    "{},{},{},{},{},{},{}",
                    t,
                    summary.surviving[k],
                    name.as_ref(),
                    cell(&summary.mean, i, k),
                    cell(&summary.std_dev, i, k),
                    cell(&summary.min, i, k),
                    cell(&summary.max, i, k),
                )?;
            }
        }
        file.flush()
    };
    body(&mut file).map_err(|e| io_error(path, e))
}

pub fn write_summary_to_csv<P: AsRef<Path>>(path: P, summary_data: &[(&str, &str)]) -> SdeResult<()> {
    let path = path.as_ref();
    let mut file = create(path)?;
    let body = |file: &mut BufWriter<File>| -> io::Result<()> {
        for (key, value) in summary_data {
            writeln!(file, "{},{}", key, value)?;
        }
        file.flush()
    };
    body(&mut file).map_err(|e| io_error(path, e))
}
