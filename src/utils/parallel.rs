//! # Parallelism Utilities (CPU Threading)
//!
//! Thin helpers over `rayon` used by the forest and the grid search.

use crate::error::ModelError;
use rayon::prelude::*;

/// Maps `f` over `items`, honoring a scikit-learn style `n_jobs` setting.
///
/// * `Some(1)` (or `Some(0)`): run sequentially on the calling thread.
/// * `None`: use rayon's global pool.
/// * `Some(n)`: use a dedicated pool with `n` threads.
///
/// Output order matches input order.
pub fn map_maybe_parallel<T, R, F>(items: Vec<T>, n_jobs: Option<usize>, f: F) -> Result<Vec<R>, ModelError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Send + Sync,
{
    match n_jobs {
        Some(0) | Some(1) => Ok(items.into_iter().map(f).collect()),
        None => Ok(items.into_par_iter().map(f).collect()),
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
            Ok(pool.install(|| items.into_par_iter().map(f).collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_order_for_every_mode() {
        let input: Vec<usize> = (0..50).collect();
        let expected: Vec<usize> = input.iter().map(|v| v * 2).collect();
        for n_jobs in [Some(1), None, Some(3)] {
            let out = map_maybe_parallel(input.clone(), n_jobs, |v| v * 2).unwrap();
            assert_eq!(out, expected);
        }
    }
}
