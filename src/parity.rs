//! Parity algebra (spec §4.2): XOR-fold of equal-length byte pages, and
//! the parity-holds predicate built on top of it.

use crate::error::{Error, Result};

/// Element-wise XOR of equal-length byte buffers.
///
/// Requires at least one input; fails with [`Error::BadArity`] otherwise.
/// Fails with [`Error::BadShape`] if the buffers are not all the same
/// length.
pub fn xor_fold(buffers: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut iter = buffers.iter();
    let first = iter.next().ok_or(Error::BadArity)?;
    let mut acc = first.clone();
    for buf in iter {
        if buf.len() != acc.len() {
            return Err(Error::BadShape(format!(
                "xor_fold: buffer length {} does not match {}",
                buf.len(),
                acc.len()
            )));
        }
        for (a, b) in acc.iter_mut().zip(buf.iter()) {
            *a ^= b;
        }
    }
    Ok(acc)
}

/// True iff `xor_fold(pages) == 0`, equivalently `pages[0] == xor_fold(pages[1..])`.
///
/// All inputs must share a single length; mismatches fail [`Error::BadShape`].
pub fn parity_holds(pages: &[Vec<u8>]) -> Result<bool> {
    if pages.is_empty() {
        return Err(Error::BadArity);
    }
    let page_len = pages[0].len();
    for p in pages {
        if p.len() != page_len {
            return Err(Error::BadShape(format!(
                "parity_holds: buffer length {} does not match {}",
                p.len(),
                page_len
            )));
        }
    }
    let folded = xor_fold(pages)?;
    Ok(folded.iter().all(|&b| b == 0))
}
