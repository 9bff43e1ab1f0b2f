use std::{collections::TryReserveError, io};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("L{level}: {field} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo {
        level: usize,
        field: &'static str,
        value: usize,
    },

    #[error("L{level}: cache size {size} is not a multiple of {block_size}B blocks x {ways} ways")]
    SizeMismatch {
        level: usize,
        size: usize,
        block_size: usize,
        ways: usize,
    },

    #[error("L{level}: sector size {sector_size} must be a power of two dividing block size {block_size}")]
    SectorSize {
        level: usize,
        sector_size: usize,
        block_size: usize,
    },

    #[error("L{level}: {policy} supports at most {max} ways, got {ways}")]
    TooManyWays {
        level: usize,
        policy: &'static str,
        max: usize,
        ways: usize,
    },

    #[error("L{level}: unrecognized replacement policy: {name}")]
    UnknownPolicy { level: usize, name: String },

    #[error("L{level}: failed to allocate {entries} entries")]
    Allocation {
        level: usize,
        entries: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("trace line {line}: {reason}")]
    MalformedAccess { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the run can continue after this error. Only bad trace records
    /// are skippable; everything else aborts before or during construction.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedAccess { .. })
    }
}
