//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rolodex_core::{Email, UserId};

/// A registered user (domain type).
///
/// Deliberately not `Serialize`: the password hash must never travel past
/// the service layer. Responses use [`UserSummary`] instead.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: Email,
    /// bcrypt hash of the user's password.
    pub password_hash: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The user representation returned by the API.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: Email,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}
