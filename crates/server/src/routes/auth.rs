//! Registration, login and logout handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde::Serialize;
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{CurrentUser, UserSummary, session_keys};
use crate::services::users::{self, LoginInput, RegisterInput};
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
}

/// Envelope carrying the acting user.
#[derive(Debug, Serialize)]
struct AuthResponse {
    success: bool,
    message: String,
    user: UserSummary,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

/// Create a new account. Does not log the user in.
async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let user = users::register(state.pool(), input).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "Registration successful".to_owned(),
            user: UserSummary::from(&user),
        }),
    ))
}

/// Verify credentials and store the user identity in the session.
async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<LoginInput>,
) -> Result<Json<AuthResponse>, AppError> {
    let user = users::authenticate(state.pool(), input).await?;

    session
        .insert(session_keys::CURRENT_USER, CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("failed to store session: {e}")))?;

    Ok(Json(AuthResponse {
        success: true,
        message: "Login successful".to_owned(),
        user: UserSummary::from(&user),
    }))
}

/// Destroy the session. Responds 400 when nobody is logged in.
async fn logout(session: Session) -> Result<Json<MessageResponse>, AppError> {
    let current: Option<CurrentUser> = session
        .get(session_keys::CURRENT_USER)
        .await
        .map_err(|e| AppError::Internal(format!("failed to read session: {e}")))?;

    if current.is_none() {
        return Err(AppError::Validation("No user is logged in".to_owned()));
    }

    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Logout successful".to_owned(),
    }))
}
