//! Page-range parsing (spec §6.3): `--page-range` is a comma-separated
//! list of integers, inclusive `a-b` dash-ranges, or the literal `all`.

use crate::error::{Error, Result};

/// Parses a `--page-range` argument into a sorted, deduplicated list of
/// page indices. A token list containing `all` anywhere expands to every
/// page in `0..total_pages`, matching `_parse_range` in
/// `examples/original_source/recovery.py`: it returns the full range the
/// instant it sees `all`, regardless of position or other tokens present.
pub fn parse_page_range(spec: &str, total_pages: u64) -> Result<Vec<u64>> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(Error::Argument("--page-range must not be empty".into()));
    }

    let mut pages = Vec::new();
    for token in spec.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Argument("--page-range contains an empty token".into()));
        }
        if token == "all" {
            return Ok((0..total_pages).collect());
        }

        match token.split_once('-') {
            Some((lo, hi)) => {
                let lo: u64 = lo.trim().parse().map_err(|_| {
                    Error::Argument(format!("'{token}' is not a valid page or range"))
                })?;
                let hi: u64 = hi.trim().parse().map_err(|_| {
                    Error::Argument(format!("'{token}' is not a valid page or range"))
                })?;
                if hi < lo {
                    return Err(Error::Argument(format!("range '{token}' has end before start")));
                }
                pages.extend(lo..=hi);
            }
            None => {
                let page: u64 = token
                    .parse()
                    .map_err(|_| Error::Argument(format!("'{token}' is not a valid page number")))?;
                pages.push(page);
            }
        }
    }

    for &p in &pages {
        if p >= total_pages {
            return Err(Error::Argument(format!(
                "page {p} is out of range (array has {total_pages} pages)"
            )));
        }
    }

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}

/// The full page range for a candidate set: `0..(min_file_len / page_size)`
/// — the conservative fallback used when the caller hasn't narrowed the
/// scan, sized to the smallest candidate so every file can serve every
/// requested page.
pub fn full_range(min_candidate_len: u64, page_size: u64) -> Vec<u64> {
    let total_pages = min_candidate_len / page_size;
    (0..total_pages).collect()
}
