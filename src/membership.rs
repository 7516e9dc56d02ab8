//! Membership search (spec §4.6): which `C(|candidates|, n)` combinations of
//! image files hold parity over a sampled page range.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use itertools::Itertools;
use rayon::ThreadPool;

use crate::error::Result;
use crate::page_io;
use crate::parity;
use crate::worker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Accept as soon as any sampled page passes; reject only if every page fails.
    FirstMatch,
    /// Accept only if every sampled page passes.
    TestAll,
}

/// Enumerates every unordered `n`-combination of `candidates` and evaluates
/// parity on `pages` for each, per `mode`. Combinations are unordered:
/// parity equality under XOR doesn't depend on which member holds parity
/// (spec §4.6's rationale) — ordering is recovered separately, by
/// [`crate::order::guess_order`].
pub fn guess_set(
    candidates: &[PathBuf],
    n: usize,
    page_size: u64,
    pages: &[u64],
    mode: SearchMode,
    pool: &ThreadPool,
    cancel: &AtomicBool,
) -> Result<Vec<Vec<PathBuf>>> {
    let combos: Vec<Vec<PathBuf>> = candidates.iter().cloned().combinations(n).collect();
    tracing::debug!(combinations = combos.len(), pages = pages.len(), "searching for RAID5 membership");

    let verdicts = worker::map_cancelable(pool, &combos, cancel, |combo| {
        check_combination(combo, page_size, pages, mode)
    })?;

    Ok(combos
        .into_iter()
        .zip(verdicts)
        .filter_map(|(combo, accepted)| accepted.then_some(combo))
        .collect())
}

fn check_combination(combo: &[PathBuf], page_size: u64, pages: &[u64], mode: SearchMode) -> Result<bool> {
    let handles: Vec<(File, &Path)> = combo
        .iter()
        .map(|p| File::open(p).map(|f| (f, p.as_path())))
        .collect::<std::io::Result<_>>()?;

    let mut any_pass = false;
    let mut all_pass = true;
    for &page in pages {
        let bufs: Result<Vec<Vec<u8>>> = handles
            .iter()
            .map(|(f, p)| page_io::read_page(f, p, page_size, page))
            .collect();
        let holds = parity::parity_holds(&bufs?)?;
        tracing::trace!(?combo, page, holds, "trying combination");

        if holds {
            any_pass = true;
            if mode == SearchMode::FirstMatch {
                break;
            }
        } else {
            all_pass = false;
            if mode == SearchMode::TestAll {
                break;
            }
        }
    }

    Ok(match mode {
        SearchMode::FirstMatch => any_pass,
        SearchMode::TestAll => all_pass,
    })
}
