//! Order inference (spec §4.7, order half): locate the parity column's
//! rotational signature in each member and recover the column order.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use rayon::ThreadPool;

use crate::classifier;
use crate::error::{Error, Result};
use crate::page_io;
use crate::worker;

/// The rotational signature for an `n`-member array: `n-1` data-like pages
/// followed by one parity-like page, repeated twice (spec §4.7).
pub(crate) fn signature(n: usize) -> Vec<bool> {
    let mut sig = Vec::with_capacity(2 * n);
    for _ in 0..2 {
        sig.extend(std::iter::repeat(true).take(n - 1));
        sig.push(false);
    }
    sig
}

/// Finds the first occurrence of the rotational [`signature`] within
/// `bits`, returning its starting index.
pub(crate) fn find_signature(bits: &[bool], n: usize) -> Option<usize> {
    let sig = signature(n);
    if bits.len() < sig.len() {
        return None;
    }
    bits.windows(sig.len()).position(|w| w == sig.as_slice())
}

/// Classifies every page in `pages` of `file`, in order, using `pool` and
/// respecting `cancel` (spec §5's order-preserving, page-granular parallel
/// map).
pub(crate) fn classify_pages(
    file: &File,
    path: &Path,
    page_size: u64,
    pages: &[u64],
    pool: &ThreadPool,
    cancel: &AtomicBool,
) -> Result<Vec<bool>> {
    worker::map_cancelable(pool, pages, cancel, |&page| {
        let buf = page_io::read_page(file, path, page_size, page)?;
        Ok(classifier::is_printable_page(&buf))
    })
}

fn find_parity_run(path: &Path, page_size: u64, n: usize, pages: &[u64], pool: &ThreadPool, cancel: &AtomicBool) -> Result<Option<usize>> {
    let file = File::open(path)?;
    let bits = classify_pages(&file, path, page_size, pages, pool, cancel)?;
    Ok(find_signature(&bits, n))
}

/// Recovers the RAID5 member order for `candidates`, per spec §4.7.
///
/// For each file, locates the rotational signature and derives the column
/// at which that file's parity page sits; placing files by column and
/// reversing the resulting vector gives the data layout (the original
/// source's derivation for the reversal is informal — see `DESIGN.md` for
/// how it was validated here).
pub fn guess_order(
    candidates: &[PathBuf],
    page_size: u64,
    pages: &[u64],
    pool: &ThreadPool,
    cancel: &AtomicBool,
) -> Result<Vec<PathBuf>> {
    let n = candidates.len();
    if n < 3 {
        return Err(Error::Argument(format!("RAID5 requires at least 3 members, got {n}")));
    }

    let mut order: Vec<Option<PathBuf>> = vec![None; n];
    for path in candidates {
        let idx = find_parity_run(path, page_size, n, pages, pool, cancel)?
            .ok_or_else(|| Error::OrderUndetermined(path.display().to_string()))?;
        let column = (idx + n - 1) % n;
        if order[column].is_some() {
            return Err(Error::OrderCollision(column as u32));
        }
        order[column] = Some(path.clone());
        tracing::debug!(path = %path.display(), idx, column, "located parity signature");
    }

    let mut result: Vec<PathBuf> = order.into_iter().map(|o| o.expect("every column was assigned")).collect();
    result.reverse();
    Ok(result)
}
