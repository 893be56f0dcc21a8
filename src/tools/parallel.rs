//! Rayon fan-out for independent per-tool work.

/// Apply `work` to every item, concurrently when `parallel` is set.
///
/// Results keep the input order. Items share nothing mutable; each returns
/// its own value and the caller merges after the join.
pub fn map_items<T, R>(items: Vec<T>, parallel: bool, work: impl Fn(T) -> R + Sync + Send) -> Vec<R>
where
    T: Send,
    R: Send,
{
    if parallel {
        use rayon::prelude::*;
        items.into_par_iter().map(work).collect()
    } else {
        items.into_iter().map(work).collect()
    }
}
