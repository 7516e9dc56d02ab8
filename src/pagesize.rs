//! Pagesize inference (spec §4.7, pagesize half): find the largest
//! plausible stripe-unit size by searching for the rotational signature at
//! each candidate size, largest first.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use rayon::ThreadPool;

use crate::error::Result;
use crate::order;

/// Inference candidates, in the descending order §4.7/§9 call for: a
/// smaller correct page size can also spuriously match the signature (two
/// adjacent data stripes both classifying as printable), so scanning
/// largest-first and returning the first hit favors the true unit size.
pub const CANDIDATES_KB: [u64; 5] = [1024, 512, 256, 128, 64];

/// Finds the largest candidate page size (in bytes) for which the
/// rotational signature appears in `path`, or `None` if none match.
pub fn guess_pagesize(path: &Path, array_size: usize, pool: &ThreadPool, cancel: &AtomicBool) -> Result<Option<u64>> {
    let file_len = std::fs::metadata(path)?.len();

    for &kb in &CANDIDATES_KB {
        let page_size = kb * 1024;
        let npages = file_len / page_size;
        if npages == 0 {
            continue;
        }
        let pages: Vec<u64> = (0..npages).collect();
        let file = File::open(path)?;
        let bits = order::classify_pages(&file, path, page_size, &pages, pool, cancel)?;
        if order::find_signature(&bits, array_size).is_some() {
            tracing::debug!(page_size, "pagesize signature matched");
            return Ok(Some(page_size));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn candidates_are_descending() {
        let mut sorted = CANDIDATES_KB.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(CANDIDATES_KB.to_vec(), sorted);
    }

    #[test]
    fn returns_none_when_file_too_small_for_any_candidate() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        f.write_all(&[0u8; 1024]).unwrap(); // smaller than even one 64 KiB page
        let pool = worker::build_pool(1).unwrap();
        let cancel = AtomicBool::new(false);
        let result = guess_pagesize(f.path(), 4, &pool, &cancel).unwrap();
        assert_eq!(result, None);
    }
}
