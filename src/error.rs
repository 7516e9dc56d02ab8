//! Error taxonomy shared by every component.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("argument error: {0}")]
    Argument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("short read from {path}: expected {expected} bytes at page {page}, got {actual}")]
    IoShort {
        path: PathBuf,
        page: u64,
        expected: usize,
        actual: usize,
    },

    #[error("no member image covers raid index {raid_index} at byte offset {offset} (page {page})")]
    GeometryGap {
        raid_index: u32,
        page: u64,
        offset: u64,
    },

    #[error("invalid geometry file {path}:{line}: {message}")]
    GeometryFile {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("bad buffer shape: {0}")]
    BadShape(String),

    #[error("xor_fold requires at least one input buffer")]
    BadArity,

    #[error("parity check failed for page {0}")]
    ParityMismatch(u64),

    #[error("could not determine RAID member order: {0}")]
    OrderUndetermined(String),

    #[error("order inference placed two members at column {0}")]
    OrderCollision(u32),

    #[error("scan cancelled")]
    Cancelled,
}

impl Error {
    /// Exit code per the policy in spec.md §7.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Argument(_) => 2,
            _ => 1,
        }
    }
}
