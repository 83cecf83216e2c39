//! Store Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Whatever `sqlx` (or the row decoding)
//! complained about is kept as a child frame of the error tree; callers only
//! ever need to branch on the [`ErrorKind`].

use derive_more::{Display, Error};

/// A store error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No book matches the given id. Covers ids that were never valid
    /// (`<= 0`), ids that never existed and ids that have been deleted.
    #[display("record not found")]
    NotFound,
    /// The book changed (or disappeared) since the caller last read it.
    #[display("edit conflict: the record was modified since it was last read")]
    EditConflict,
    /// Anything else; the database or the data in it is at fault.
    #[display("storage failure: {_0}")]
    StorageFailure(#[error(not(source))] Failure),
}

/// What kind of storage failure happened, for diagnostics only.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    #[display("invalid stored {_0}")]
    InvalidData(&'static str),
}

impl ErrorKind {
    pub(crate) const DATABASE: Self = Self::StorageFailure(Failure::Database);
    pub(crate) const MIGRATION: Self = Self::StorageFailure(Failure::Migration);

    pub(crate) fn invalid(field: &'static str) -> Self {
        Self::StorageFailure(Failure::InvalidData(field))
    }

    /// Returns `true` if retrying might succeed.
    ///
    /// Only an edit conflict qualifies, and only once the caller has fetched
    /// the current state of the record again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EditConflict)
    }

    /// Returns `true` for anything that isn't the caller's fault.
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::StorageFailure(_))
    }
}
