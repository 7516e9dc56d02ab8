//! Page I/O (spec §4.1): read a fixed-size page from a file at a
//! page-indexed offset. Always a positional read — no file handle here
//! ever has its seek position mutated, which is what makes sharing one
//! handle across worker threads and concurrent `pread` calls sound.

use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads page `page_index` (each `page_size` bytes wide) from `file`.
///
/// Fails with [`Error::IoShort`] if the file is shorter than
/// `(page_index + 1) * page_size`.
pub fn read_page(file: &File, path: &Path, page_size: u64, page_index: u64) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; page_size as usize];
    let offset = page_index * page_size;

    let mut total = 0usize;
    while total < buf.len() {
        let n = file.read_at(&mut buf[total..], offset + total as u64)?;
        if n == 0 {
            break;
        }
        total += n;
    }

    if total < buf.len() {
        return Err(Error::IoShort {
            path: path.to_path_buf(),
            page: page_index,
            expected: buf.len(),
            actual: total,
        });
    }

    tracing::trace!(path = %path.display(), page_index, page_size, "read page");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_an_exact_page() {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(&[1u8; 16]).unwrap();
        f.write_all(&[2u8; 16]).unwrap();
        let page = read_page(&f, Path::new("<mem>"), 16, 1).unwrap();
        assert_eq!(page, vec![2u8; 16]);
    }

    #[test]
    fn short_file_fails_with_io_short() {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(&[9u8; 10]).unwrap();
        let err = read_page(&f, Path::new("<mem>"), 16, 0).unwrap_err();
        match err {
            Error::IoShort { expected, actual, .. } => {
                assert_eq!(expected, 16);
                assert_eq!(actual, 10);
            }
            other => panic!("expected IoShort, got {other:?}"),
        }
    }

    #[test]
    fn page_entirely_past_eof_is_short() {
        let mut f = tempfile::tempfile().unwrap();
        f.write_all(&[9u8; 10]).unwrap();
        let err = read_page(&f, Path::new("<mem>"), 16, 3).unwrap_err();
        assert!(matches!(err, Error::IoShort { actual: 0, .. }));
    }
}
