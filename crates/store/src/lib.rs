//! SQLite-backed storage for the reading list.
//!
//! The store manages exactly one entity, the [`Book`], and exposes the five
//! operations the API is built on: insert, get, update, delete and list (see
//! [`Repository`]).
//!
//! # Concurrency
//! Records carry a version number that starts at 1 and is bumped on every
//! successful update. Updates are conditional on the version the caller last
//! read, so two writers racing on the same record can't silently overwrite
//! each other: the second one gets [`ErrorKind::EditConflict`] and has to
//! re-read before trying again.
//!
//! [`ErrorKind::EditConflict`]: crate::error::ErrorKind::EditConflict

mod book;
mod db;
pub mod error;
mod models;
mod patch;
mod repo;

pub use crate::book::Book;
pub use crate::db::Database;
pub use crate::patch::BookPatch;
pub use crate::repo::Repository;
