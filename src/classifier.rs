//! Page classifier (spec §4.7, classifier half): a cheap "looks like
//! structured data, not parity" heuristic used as the oracle for order and
//! pagesize inference.

use std::collections::HashSet;

/// Below this many distinct byte values, a non-zero page is considered
/// printable/structured (spec §4.7). Empirical, tunable — not a magic
/// number buried in the body of [`is_printable_page`].
pub const PRINTABLE_CARDINALITY_THRESHOLD: usize = 80;

/// `false` for an all-zero page; otherwise `true` iff the page's distinct
/// byte-value count is strictly below [`PRINTABLE_CARDINALITY_THRESHOLD`].
pub fn is_printable_page(page: &[u8]) -> bool {
    if page.iter().all(|&b| b == 0) {
        return false;
    }
    let distinct: HashSet<u8> = page.iter().copied().collect();
    distinct.len() < PRINTABLE_CARDINALITY_THRESHOLD
}
