//! Tag handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::Serialize;

use rolodex_core::TagId;

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{Tag, TagWithCount};
use crate::services::tags::{self, CreateTagInput, UpdateTagInput};
use crate::state::AppState;

/// Build the tags router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(list_tags).post(create_tag))
        .route("/api/tags/{tag_id}", put(update_tag).delete(delete_tag))
}

#[derive(Debug, Serialize)]
struct TagListResponse {
    success: bool,
    tags: Vec<TagWithCount>,
}

#[derive(Debug, Serialize)]
struct TagResponse {
    success: bool,
    message: String,
    tag: Tag,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

async fn list_tags(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<TagListResponse>, AppError> {
    let tags = tags::list_tags(state.pool(), current.id).await?;
    Ok(Json(TagListResponse {
        success: true,
        tags,
    }))
}

async fn create_tag(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<CreateTagInput>,
) -> Result<(StatusCode, Json<TagResponse>), AppError> {
    let tag = tags::create_tag(state.pool(), current.id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(TagResponse {
            success: true,
            message: "Tag added successfully!".to_owned(),
            tag,
        }),
    ))
}

async fn update_tag(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(tag_id): Path<i32>,
    Json(input): Json<UpdateTagInput>,
) -> Result<Json<TagResponse>, AppError> {
    let tag = tags::update_tag(state.pool(), current.id, TagId::new(tag_id), input).await?;
    Ok(Json(TagResponse {
        success: true,
        message: "Tag updated successfully!".to_owned(),
        tag,
    }))
}

async fn delete_tag(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(tag_id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    tags::delete_tag(state.pool(), current.id, TagId::new(tag_id)).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Tag deleted successfully!".to_owned(),
    }))
}
