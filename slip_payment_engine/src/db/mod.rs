//! Storage backends for the slip payment engine.
//!
//! A backend is anything that implements [`crate::traits::ReconciliationDatabase`]. SQLite is
//! the one that ships: a single-file store is a comfortable fit for a gateway fronting one
//! merchant. The queries live in per-concern modules that operate on a borrowed connection, so
//! they compose into transactions when a flow needs atomicity across statements.

#[cfg(feature = "sqlite")]
pub mod sqlite;
