use oxidize_select_core::error::{MlError, MlResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Worker count for fold x candidate units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NJobs {
    Fixed(usize),
    /// One worker per available core.
    All,
}

impl Default for NJobs {
    fn default() -> Self {
        NJobs::Fixed(1)
    }
}

impl NJobs {
    pub fn workers(self) -> MlResult<usize> {
        match self {
            NJobs::Fixed(0) => Err(MlError::invalid_param("n_jobs", "must be at least 1")),
            NJobs::Fixed(n) => Ok(n),
            NJobs::All => Ok(std::thread::available_parallelism().map_or(1, |n| n.get())),
        }
    }
}

/// Run `unit(0..n_units)` and return the outputs in unit order.
///
/// With more than one worker the units run on a dedicated rayon pool; the
/// output is the same as a sequential run because every unit is independent.
pub fn run_units<T, F>(n_units: usize, n_jobs: NJobs, unit: F) -> MlResult<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    let workers = n_jobs.workers()?.min(n_units.max(1));
    if workers == 1 {
        return Ok((0..n_units).map(unit).collect());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|e| MlError::InvalidOperation(format!("failed to start worker pool: {}", e)))?;
    Ok(pool.install(|| (0..n_units).into_par_iter().map(unit).collect()))
}
