//! Parallel page-range scanning (spec §5): "map this pure function over a
//! page range" using a worker pool of `nproc` workers, order-preserving,
//! with page-granularity cancellation.
//!
//! `rayon` gives order-preserving `map`/`collect` for free (grounded on
//! `other_examples/manifests/ringo380-idb-utils`, a forensic file-analysis
//! CLI with the same page/block-scanning shape); `ctrlc` wires a single
//! SIGINT handler to the shared cancellation flag every worker polls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{Error, Result};

/// Installs a SIGINT handler that flips the returned flag once. Safe to
/// call more than once per process only if each call's flag is distinct;
/// callers typically install this once at CLI startup.
pub fn install_cancel_handler() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    // ctrlc::set_handler can only be called once per process; a second call
    // would return an error we deliberately ignore here, since a CLI
    // invocation only ever installs this once in practice.
    let _ = ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    });
    flag
}

pub fn is_cancelled(cancel: &AtomicBool) -> bool {
    cancel.load(Ordering::SeqCst)
}

/// Builds a `rayon` thread pool sized to `nproc` (clamped to at least 1),
/// so `--nproc` is honored rather than falling back to rayon's global
/// default pool.
pub fn build_pool(nproc: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(nproc.max(1))
        .build()
        .map_err(|e| Error::Argument(format!("failed to build worker pool: {e}")))
}

/// Maps `f` over `items` inside `pool`, preserving input order, checking
/// `cancel` before each item and short-circuiting to
/// [`Error::Cancelled`] the moment it's set.
pub fn map_cancelable<T, R>(
    pool: &ThreadPool,
    items: &[T],
    cancel: &AtomicBool,
    f: impl Fn(&T) -> Result<R> + Sync,
) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
{
    pool.install(|| {
        items
            .par_iter()
            .map(|item| {
                if is_cancelled(cancel) {
                    return Err(Error::Cancelled);
                }
                f(item)
            })
            .collect()
    })
}
