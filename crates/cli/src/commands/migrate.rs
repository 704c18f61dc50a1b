//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! rolodex-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ROLODEX_DATABASE_URL` - SQLite connection string
//!   (default: `sqlite://rolodex.db?mode=rwc`)

use rolodex_server::config::ServerConfig;
use rolodex_server::db;

/// Run the embedded migrations against the configured database.
///
/// # Errors
///
/// Returns an error if the configuration is malformed, the database cannot
/// be opened, or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
