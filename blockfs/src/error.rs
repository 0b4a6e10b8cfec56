//! Error taxonomy for every public [`crate::fs::FileSystem`] operation.
//!
//! Mirrors the original's single global `fserror` variable, but as a
//! `Result` return value plus a best-effort [`FsError::last`] accessor kept
//! on the [`crate::fs::FileSystem`] instance rather than as process state.

use thiserror::Error;

/// Every outcome a `FileSystem` call can report, one variant per taxonomy
/// entry in the specification's error handling section.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FsError {
    #[error("operation requires more free data blocks than are available")]
    OutOfSpace,
    #[error("operation requires an open file handle")]
    FileNotOpen,
    #[error("file is already open")]
    FileOpen,
    #[error("no file with that name exists")]
    FileNotFound,
    #[error("file was opened read-only")]
    FileReadOnly,
    #[error("a file with that name already exists")]
    FileAlreadyExists,
    #[error("request exceeds the maximum file size")]
    ExceedsMaxFileSize,
    #[error("filename is empty or too long")]
    IllegalFilename,
    #[error("backing device I/O failure: {0}")]
    Io(String),
}

impl FsError {
    pub(crate) fn io<E: core::fmt::Display>(e: E) -> Self {
        FsError::Io(e.to_string())
    }
}
