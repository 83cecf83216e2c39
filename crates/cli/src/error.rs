//! CLI Error Types
//!
//! This is the transport boundary: the store's error kinds are translated
//! into process exit codes here.

use derive_more::{Display, Error};
use readinglist_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};

/// A CLI error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("configuration error")]
    Config,
    #[display("could not prepare database location")]
    Filesystem,
    #[display("invalid usage: {_0}")]
    Usage(#[error(not(source))] &'static str),
    #[display("{_0}")]
    Store(#[error(not(source))] StoreErrorKind),
    #[display("failed to write output")]
    Output,
}

impl ErrorKind {
    /// Wrap a store error, keeping its error tree as a child.
    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let kind = *err;
        err.raise(ErrorKind::Store(kind))
    }

    /// Process exit code for this kind of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config | Self::Usage(_) => 2,
            Self::Store(StoreErrorKind::NotFound) => 4,
            Self::Store(StoreErrorKind::EditConflict) => 9,
            Self::Store(StoreErrorKind::StorageFailure(_)) | Self::Filesystem | Self::Output => 1,
        }
    }
}
