//! Restored-image output (spec §6.4): reassemble `N−1` data pages per
//! stripe into a raw binary file, aborting on the first broken stripe.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::error::{Error, Result};
use crate::page_io;
use crate::parity;
use crate::stripe;

/// Reads one stripe's worth of member pages (in `members_in_order`'s column
/// order) — in parallel across `pool`, since the per-page reads are
/// independent — verifies parity, and returns the `N−1` data pages
/// concatenated in ascending logical order (spec §4.3, §6.4).
fn assemble_stripe(pool: &ThreadPool, handles: &[(File, &Path)], page_size: u64, page: u64) -> Result<Vec<u8>> {
    let n = handles.len();
    let bufs: Result<Vec<Vec<u8>>> = pool.install(|| {
        handles
            .par_iter()
            .map(|(f, p)| page_io::read_page(f, p, page_size, page))
            .collect()
    });
    let bufs = bufs?;

    if !parity::parity_holds(&bufs)? {
        return Err(Error::ParityMismatch(page));
    }

    let slots = stripe::stripe_map(n, page);
    let order = stripe::data_column_order(&slots);

    let mut out = Vec::with_capacity(page_size as usize * (n - 1));
    for column in order {
        out.extend_from_slice(&bufs[column]);
    }
    Ok(out)
}

/// Writes the restored image to `output`, failing if it already exists
/// (spec §6.3). `members_in_order` must already be in column order (as
/// produced by [`crate::order::guess_order`]); `pages` is the stripe range
/// to restore, typically ascending.
///
/// Streams each stripe to `output` as soon as it's verified, matching
/// `recovery.py`'s `restore` — the output file is created up front and
/// grows page by page, rather than buffering the whole reconstructed
/// volume in memory before writing anything. Aborts on the first page
/// whose parity doesn't hold (or on cancellation), leaving the file with
/// every stripe written so far on disk for the caller to remove (spec §7).
pub fn restore(
    members_in_order: &[PathBuf],
    page_size: u64,
    pages: &[u64],
    output: &Path,
    pool: &ThreadPool,
    cancel: &AtomicBool,
) -> Result<()> {
    let handles: Vec<(File, &Path)> = members_in_order
        .iter()
        .map(|p| File::open(p).map(|f| (f, p.as_path())))
        .collect::<std::io::Result<_>>()?;

    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(output)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                Error::Argument(format!("output file {} already exists", output.display()))
            } else {
                Error::Io(e)
            }
        })?;
    let mut writer = BufWriter::new(file);

    for &page in pages {
        if cancel.load(Ordering::SeqCst) {
            writer.flush()?;
            return Err(Error::Cancelled);
        }
        let stripe_bytes = match assemble_stripe(pool, &handles, page_size, page) {
            Ok(bytes) => bytes,
            Err(e) => {
                writer.flush()?;
                return Err(e);
            }
        };
        writer.write_all(&stripe_bytes)?;
    }
    writer.flush()?;

    tracing::info!(pages = pages.len(), output = %output.display(), "restored image written");
    Ok(())
}
