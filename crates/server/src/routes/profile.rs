//! Profile handlers: view, update, delete account.

use axum::{
    Json, Router,
    extract::State,
    routing::{delete, get},
};
use serde::Serialize;
use tower_sessions::Session;

use rolodex_core::Email;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, session_keys};
use crate::services::users::{self, ProfileUpdateInput};
use crate::state::AppState;

/// Build the profile router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).put(update_profile))
        .route("/api/delete_account", delete(delete_account))
}

/// Profile body: the account identity without the internal ID.
#[derive(Debug, Serialize)]
struct ProfileBody {
    username: String,
    email: Email,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    user: ProfileBody,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

async fn get_profile(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = users::get_profile(state.pool(), current.id).await?;

    Ok(Json(ProfileResponse {
        success: true,
        message: None,
        user: ProfileBody {
            username: user.username,
            email: user.email,
        },
    }))
}

/// Update the profile with merge semantics and refresh the session identity.
async fn update_profile(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<ProfileUpdateInput>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = users::update_profile(state.pool(), current.id, input).await?;

    // Keep the session identity in sync with the new username/email.
    session
        .insert(session_keys::CURRENT_USER, CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("failed to refresh session: {e}")))?;

    Ok(Json(ProfileResponse {
        success: true,
        message: Some("Profile updated successfully!".to_owned()),
        user: ProfileBody {
            username: user.username,
            email: user.email,
        },
    }))
}

/// Delete the account with everything it owns, then destroy the session.
async fn delete_account(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<MessageResponse>, AppError> {
    users::delete_account(state.pool(), current.id).await?;

    session
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;

    Ok(Json(MessageResponse {
        success: true,
        message: "Account deleted successfully!".to_owned(),
    }))
}
