//! User management commands.

use rolodex_server::config::ServerConfig;
use rolodex_server::db;
use rolodex_server::services::users::{self, RegisterInput};

/// Create a user account.
///
/// Goes through the same validation and password hashing as the HTTP
/// registration endpoint.
///
/// # Errors
///
/// Returns an error for malformed input, a duplicate username/email, or a
/// storage failure.
pub async fn create(
    username: String,
    email: String,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let user = users::register(
        &pool,
        RegisterInput {
            username,
            email,
            password,
        },
    )
    .await?;

    tracing::info!("Created user {} <{}> (id {})", user.username, user.email, user.id);
    Ok(())
}
