//! Engine error type
//!
//! Every fallible operation in the crate returns [`Result`]. I/O failures
//! and file corruption both surface as [`Error::File`]; corruption carries
//! [`std::io::ErrorKind::InvalidData`] so callers can tell the two apart
//! without a dedicated variant. Version skew in persisted files is an
//! [`Error::InvalidArgument`], since a newer build could read the file.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied parameter is out of range or inconsistent with the
    /// instance it was passed to (wrong dimension, zero ef, bad version).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An allocation was refused.
    #[error("out of memory")]
    OutOfMemory,

    /// File I/O failed, or a persisted file failed validation
    /// (`ErrorKind::InvalidData`).
    #[error("file error: {0}")]
    File(#[from] std::io::Error),

    /// The id is already present in the store or index.
    #[error("duplicate id: {0}")]
    DuplicateId(u64),

    /// The id is not present.
    #[error("id not found: {0}")]
    IdNotFound(u64),

    /// The index has reached its fixed capacity.
    #[error("index full: capacity {0} reached")]
    IndexFull(usize),
}

impl Error {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Error::InvalidArgument(format!(
            "dimension mismatch: expected {expected}, got {actual}"
        ))
    }

    /// A persisted file failed structural validation.
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::File(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            msg.into(),
        ))
    }
}
