//! Stripe map (spec §4.3): left-asymmetric RAID5 rotation.
//!
//! Implemented to match the reference `raid5_stripes` in
//! `examples/original_source/{nbd_raid5.py,recovery.py}` exactly, including
//! its negative-index wraparound — see `DESIGN.md` for why the prose
//! formula in spec.md §4.3/§8 cannot be trusted as-is and the reference
//! implementation was followed instead.

/// Marker for the parity slot in a [`stripe_map`] result.
pub const PARITY: i64 = -1;

/// Returns a length-`n` vector whose slot `k` is either [`PARITY`] or a
/// non-negative linear data-page index, for the stripe at `page_index`.
///
/// `n` must be at least 3 (spec §3); callers are expected to have already
/// validated array geometry before calling this.
pub fn stripe_map(n: usize, page_index: u64) -> Vec<i64> {
    debug_assert!(n >= 3, "RAID5 requires at least 3 members");
    let n_i64 = n as i64;
    let r = (page_index % n as u64) as i64;
    let first_stripe = (page_index * (n as u64 - 1)) as i64;

    let mut slots = vec![PARITY; n];
    for d in 0..(n_i64 - 1) {
        let slot = (d - r).rem_euclid(n_i64) as usize;
        slots[slot] = first_stripe + d;
    }
    slots
}

/// Given a stripe's slot vector, returns the data-member column visit order:
/// the permutation that sorts slots ascending, with the parity slot (always
/// sorted first, since [`PARITY`] is the minimum value) dropped.
///
/// This yields exactly the `n - 1` data members in ascending logical-page
/// order, per spec §4.4 step 2b.
pub fn data_column_order(slots: &[i64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..slots.len()).collect();
    order.sort_by_key(|&i| slots[i]);
    order.remove(0);
    order
}
