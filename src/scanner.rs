//! Parity check scanner (spec §4.5): pure, read-only verification of an
//! already-ordered candidate tuple over a page range.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::page_io;
use crate::parity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed(Vec<u64>),
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Passed)
    }
}

/// Checks parity of `files_in_column_order` (must already be in correct
/// column order — parity itself can't tell, per spec §4.5) over every page
/// in `pages`. Never mutates anything.
pub fn test_parity(files_in_column_order: &[PathBuf], page_size: u64, pages: &[u64]) -> Result<Verdict> {
    let handles: Vec<(File, &Path)> = files_in_column_order
        .iter()
        .map(|p| File::open(p).map(|f| (f, p.as_path())))
        .collect::<std::io::Result<_>>()?;

    let mut failing = Vec::new();
    for &page in pages {
        let bufs: Result<Vec<Vec<u8>>> = handles
            .iter()
            .map(|(f, p)| page_io::read_page(f, p, page_size, page))
            .collect();
        let holds = parity::parity_holds(&bufs?)?;
        tracing::debug!(page, holds, "parity check");
        if !holds {
            failing.push(page);
        }
    }

    if failing.is_empty() {
        Ok(Verdict::Passed)
    } else {
        Ok(Verdict::Failed(failing))
    }
}
