//! Per-column fan-out on a bounded rayon pool

use crate::{FeatherError, Result};
use rayon::prelude::*;

/// Environment variable capping worker threads when no explicit count is set
pub const NUM_THREADS_ENV: &str = "FEATHER_NUM_THREADS";

/// Resolve how many workers to use for `num_tasks` independent columns
///
/// An explicit count wins, then `FEATHER_NUM_THREADS`, then the machine's
/// available parallelism. Never more workers than tasks, never fewer than one.
pub fn resolve_threads(explicit: Option<usize>, num_tasks: usize) -> usize {
    let configured = explicit.or_else(|| {
        std::env::var(NUM_THREADS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
    });
    let logical_threads = configured.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    logical_threads.min(num_tasks).max(1)
}

/// Map `f` over `items`, keeping input order in the output
///
/// With `use_threads` the work runs on a dedicated pool; the first error
/// observed is returned and the remaining results are dropped.
pub fn map_columns<T, U, F>(
    items: &[T],
    use_threads: bool,
    num_threads: Option<usize>,
    f: F,
) -> Result<Vec<U>>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U> + Sync + Send,
{
    let threads = resolve_threads(num_threads, items.len());
    if !use_threads || threads <= 1 {
        return items.iter().map(f).collect();
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| FeatherError::internal(format!("failed to build rayon thread pool: {e}")))?;

    log::debug!("fanning out {} columns over {} threads", items.len(), threads);
    pool.install(|| items.par_iter().map(f).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_threads_bounds() {
        assert_eq!(resolve_threads(Some(8), 3), 3);
        assert_eq!(resolve_threads(Some(2), 50), 2);
        assert_eq!(resolve_threads(Some(4), 0), 1);
        assert_eq!(resolve_threads(Some(0), 10), 1);
    }

    #[test]
    fn test_map_columns_keeps_order() {
        let items: Vec<usize> = (0..64).collect();
        let threaded = map_columns(&items, true, Some(4), |i| Ok(i * 2)).unwrap();
        let serial = map_columns(&items, false, None, |i| Ok(i * 2)).unwrap();
        assert_eq!(threaded, serial);
        assert_eq!(threaded[63], 126);
    }

    #[test]
    fn test_map_columns_reports_error() {
        let items: Vec<usize> = (0..16).collect();
        let result = map_columns(&items, true, Some(4), |i| {
            if *i == 7 {
                Err(FeatherError::corrupt("bad block"))
            } else {
                Ok(*i)
            }
        });
        assert!(matches!(result, Err(FeatherError::CorruptFile(_))));
    }
}
