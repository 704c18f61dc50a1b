//! Database operations for the server's SQLite store.
//!
//! # Tables
//!
//! - `users` - Account credentials and identity
//! - `contacts` - Contacts, owned by a user
//! - `tags` - Tags, owned by a user, optionally parented to another tag
//! - `contact_tags` - Contact/tag association rows
//! - `sessions` - Session storage (created by the session store)
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time. They run on server startup and via:
//! ```bash
//! cargo run -p rolodex-cli -- migrate
//! ```
//!
//! All queries are runtime-bound (`sqlx::query_as` + `bind`), so the crate
//! builds without a live database.

pub mod contacts;
pub mod tags;
pub mod users;

use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;

pub use contacts::{ContactRepository, NewContact};
pub use tags::TagRepository;
pub use users::UserRepository;

/// Embedded migrations for the application schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique tag name). Carries the database
    /// constraint message so callers can tell which column collided.
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Convert a sqlx error, mapping unique-constraint violations to
/// [`RepositoryError::Conflict`].
pub(crate) fn map_insert_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return RepositoryError::Conflict(db.message().to_owned());
        }
    }
    RepositoryError::Database(e)
}

/// Create a SQLite connection pool with sensible defaults.
///
/// Foreign keys are enabled per connection; the database file is created on
/// first use.
///
/// # Errors
///
/// Returns `sqlx::Error` if the URL is malformed or the connection cannot be
/// established.
pub async fn create_pool(database_url: &SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Run the embedded migrations against `pool`.
///
/// # Errors
///
/// Returns a `MigrateError` if a migration fails or the recorded history
/// conflicts with the embedded set.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
