//! Conditional parallel iteration.
//!
//! Uses rayon when the `parallel` feature is enabled and the caller asks for it.

/// Maps a function over items, in parallel when `parallel` is set and the
/// `parallel` feature is compiled in. Output order matches input order.
#[allow(unused_variables)]
pub(crate) fn maybe_parallel_map<T, U, F>(items: &[T], parallel: bool, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> U + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        if parallel && items.len() > 1 {
            return items.par_iter().map(f).collect();
        }
    }

    items.iter().map(f).collect()
}
