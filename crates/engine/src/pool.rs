//! Bounded per-resource worker pool.
//!
//! Both a sequential and a parallel path are always available: one worker (or
//! a single job) runs inline on the caller's thread, anything else runs on a
//! dedicated rayon pool sized from the options. Results keep job order and the
//! first error is returned.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::{PatchError, PatchErrorKind, PatchResult};

pub(crate) fn run_jobs<T, R, F>(workers: usize, jobs: &[T], run: F) -> PatchResult<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> PatchResult<R> + Sync + Send,
{
    if workers == 1 || jobs.len() <= 1 {
        return jobs.iter().map(run).collect();
    }
    let pool = ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("respatch-worker-{index}"))
        .build()
        .map_err(|error| PatchError::with_detail(PatchErrorKind::InvalidOptions, error.to_string()))?;
    pool.install(|| jobs.par_iter().map(&run).collect())
}
