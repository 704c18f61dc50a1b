//! Domain operations.
//!
//! Services own validation, ownership checks and merge semantics; the
//! repositories under [`crate::db`] own the SQL. Route handlers stay thin.

pub mod contacts;
pub mod import;
pub mod tags;
pub mod users;
