//! User account operations: registration, authentication, profile
//! management and account deletion.

use serde::Deserialize;
use sqlx::SqlitePool;

use rolodex_core::{Email, UserId};

use crate::db::{RepositoryError, UserRepository};
use crate::error::AppError;
use crate::models::User;

const MIN_USERNAME_LENGTH: usize = 3;
const MIN_PASSWORD_LENGTH: usize = 6;

/// Full-strength hashing in release builds, minimum cost in debug builds so
/// the test suite stays fast.
const BCRYPT_COST: u32 = if cfg!(debug_assertions) {
    4
} else {
    bcrypt::DEFAULT_COST
};

/// Registration payload.
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Profile update payload; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdateInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Register a new account.
///
/// # Errors
///
/// `Validation` for malformed input, `Conflict` when the email or username
/// is already taken.
pub async fn register(pool: &SqlitePool, input: RegisterInput) -> Result<User, AppError> {
    let username = validate_username(&input.username)?;
    let email = validate_email(&input.email)?;
    let password_hash = hash_password(&input.password)?;

    match UserRepository::new(pool)
        .insert(&username, &email, &password_hash)
        .await
    {
        Ok(user) => Ok(user),
        Err(e) => Err(map_account_conflict(e)),
    }
}

/// Check credentials and return the matching user.
///
/// # Errors
///
/// `Unauthorized` with a deliberately unspecific message when the email is
/// unknown or the password does not match.
pub async fn authenticate(pool: &SqlitePool, input: LoginInput) -> Result<User, AppError> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_owned());

    let Ok(email) = Email::parse(input.email.trim()) else {
        return Err(invalid());
    };

    let user = UserRepository::new(pool)
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let matches = bcrypt::verify(&input.password, &user.password_hash)
        .map_err(|e| AppError::Internal(format!("password verification failed: {e}")))?;
    if matches { Ok(user) } else { Err(invalid()) }
}

/// Fetch the profile of the given user.
///
/// # Errors
///
/// `NotFound` when the account no longer exists.
pub async fn get_profile(pool: &SqlitePool, id: UserId) -> Result<User, AppError> {
    UserRepository::new(pool)
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))
}

/// Update the profile with merge semantics.
///
/// An empty `password` field means "keep the current password", matching
/// the web form behavior.
///
/// # Errors
///
/// `Validation` for malformed input, `Conflict` on username/email
/// collision, `NotFound` when the account no longer exists.
pub async fn update_profile(
    pool: &SqlitePool,
    id: UserId,
    input: ProfileUpdateInput,
) -> Result<User, AppError> {
    let username = input
        .username
        .as_deref()
        .map(validate_username)
        .transpose()?;
    let email = input.email.as_deref().map(validate_email).transpose()?;
    let password_hash = match input.password.as_deref() {
        None | Some("") => None,
        Some(password) => Some(hash_password(password)?),
    };

    match UserRepository::new(pool)
        .update(
            id,
            username.as_deref(),
            email.as_ref(),
            password_hash.as_deref(),
        )
        .await
    {
        Ok(user) => Ok(user),
        Err(RepositoryError::NotFound) => Err(AppError::NotFound("User not found".to_owned())),
        Err(e) => Err(map_account_conflict(e)),
    }
}

/// Delete the account and everything it owns.
///
/// # Errors
///
/// `NotFound` when the account no longer exists.
pub async fn delete_account(pool: &SqlitePool, id: UserId) -> Result<(), AppError> {
    let deleted = UserRepository::new(pool).delete(id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("User not found".to_owned()));
    }
    Ok(())
}

fn validate_username(raw: &str) -> Result<String, AppError> {
    let username = raw.trim();
    if username.chars().count() < MIN_USERNAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Username must be at least {MIN_USERNAME_LENGTH} characters"
        )));
    }
    Ok(username.to_owned())
}

fn validate_email(raw: &str) -> Result<Email, AppError> {
    Email::parse(raw.trim()).map_err(|e| AppError::Validation(format!("Invalid email: {e}")))
}

fn hash_password(password: &str) -> Result<String, AppError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    bcrypt::hash(password, BCRYPT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn map_account_conflict(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::Conflict(msg) if msg.contains("email") => {
            AppError::Conflict("Email already registered".to_owned())
        }
        RepositoryError::Conflict(_) => AppError::Conflict("Username already taken".to_owned()),
        other => other.into(),
    }
}
