//! Database access for the `invoices` table.
//!
//! `repo` holds SQL-only functions over a shared `SqlitePool`; callers decide
//! what to do with failures.

pub mod repo;

pub use repo::*;
