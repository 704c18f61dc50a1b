//! Contact handlers: CRUD, queries and bulk import.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use rolodex_core::{ContactId, TagId};

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::{ContactDetail, NameField, TagWithCount};
use crate::services::contacts::{self, ContactInput};
use crate::services::import::{self, ImportFormat};
use crate::state::AppState;

/// Build the contacts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/filter", get(filter_contacts))
        .route("/api/contacts/search", get(search_contacts))
        .route("/api/contacts/text_search", get(text_search))
        .route("/api/contacts/duplicates", get(duplicates))
        .route("/api/contacts/most_common_tags", get(most_common_tags))
        .route("/api/contacts/import", post(import_contacts))
        .route(
            "/api/contacts/{contact_id}",
            get(view_contact).put(update_contact).delete(delete_contact),
        )
}

#[derive(Debug, Serialize)]
struct ContactResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    contact: ContactDetail,
}

#[derive(Debug, Serialize)]
struct ContactListResponse {
    success: bool,
    contacts: Vec<ContactDetail>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct ImportResponse {
    success: bool,
    message: String,
    imported: u64,
}

#[derive(Debug, Serialize)]
struct CommonTagsResponse {
    success: bool,
    tags: Vec<TagWithCount>,
    contacts: Vec<ContactDetail>,
}

#[derive(Debug, Deserialize)]
struct TagFilterParams {
    tag_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextSearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Deserialize)]
struct DuplicatesParams {
    field: String,
}

#[derive(Debug, Deserialize)]
struct RankingParams {
    limit: Option<i64>,
}

async fn create_contact(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Json(input): Json<ContactInput>,
) -> Result<(StatusCode, Json<ContactResponse>), AppError> {
    let contact = contacts::create_contact(state.pool(), current.id, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ContactResponse {
            success: true,
            message: Some("Contact added successfully!".to_owned()),
            contact,
        }),
    ))
}

async fn list_contacts(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<TagFilterParams>,
) -> Result<Json<ContactListResponse>, AppError> {
    let contacts =
        contacts::list_contacts(state.pool(), current.id, params.tag_id.map(TagId::new)).await?;
    Ok(Json(ContactListResponse {
        success: true,
        contacts,
    }))
}

/// Same as the list endpoint; kept as a dedicated path for the tag filter.
async fn filter_contacts(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<TagFilterParams>,
) -> Result<Json<ContactListResponse>, AppError> {
    let contacts =
        contacts::list_contacts(state.pool(), current.id, params.tag_id.map(TagId::new)).await?;
    Ok(Json(ContactListResponse {
        success: true,
        contacts,
    }))
}

async fn view_contact(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
) -> Result<Json<ContactResponse>, AppError> {
    let contact =
        contacts::get_contact(state.pool(), current.id, ContactId::new(contact_id)).await?;
    Ok(Json(ContactResponse {
        success: true,
        message: None,
        contact,
    }))
}

async fn update_contact(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
    Json(input): Json<ContactInput>,
) -> Result<Json<ContactResponse>, AppError> {
    let contact =
        contacts::update_contact(state.pool(), current.id, ContactId::new(contact_id), input)
            .await?;
    Ok(Json(ContactResponse {
        success: true,
        message: Some("Contact updated successfully!".to_owned()),
        contact,
    }))
}

async fn delete_contact(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
) -> Result<Json<MessageResponse>, AppError> {
    contacts::delete_contact(state.pool(), current.id, ContactId::new(contact_id)).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Contact deleted successfully!".to_owned(),
    }))
}

async fn search_contacts(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ContactListResponse>, AppError> {
    let contacts = contacts::search_by_name(
        state.pool(),
        current.id,
        params.first_name.as_deref(),
        params.last_name.as_deref(),
    )
    .await?;
    Ok(Json(ContactListResponse {
        success: true,
        contacts,
    }))
}

async fn text_search(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<TextSearchParams>,
) -> Result<Json<ContactListResponse>, AppError> {
    let contacts = contacts::text_search(state.pool(), current.id, &params.q).await?;
    Ok(Json(ContactListResponse {
        success: true,
        contacts,
    }))
}

async fn duplicates(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<DuplicatesParams>,
) -> Result<Json<ContactListResponse>, AppError> {
    let field: NameField = params.field.parse().map_err(AppError::Validation)?;
    let contacts = contacts::duplicates_by_field(state.pool(), current.id, field).await?;
    Ok(Json(ContactListResponse {
        success: true,
        contacts,
    }))
}

async fn most_common_tags(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    Query(params): Query<RankingParams>,
) -> Result<Json<CommonTagsResponse>, AppError> {
    let (tags, contacts) =
        contacts::most_common_tags(state.pool(), current.id, params.limit).await?;
    Ok(Json(CommonTagsResponse {
        success: true,
        tags,
        contacts,
    }))
}

/// Bulk import from an uploaded CSV, JSON or Excel file.
///
/// Expects a multipart form with a `file` part whose filename carries the
/// format extension. The whole file is imported atomically.
async fn import_contacts(
    RequireAuth(current): RequireAuth,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportResponse>), AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(ToOwned::to_owned)
                .ok_or_else(|| AppError::Validation("Uploaded file has no name.".to_owned()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("could not read upload: {e}")))?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("No file uploaded.".to_owned()))?;

    let format = ImportFormat::from_filename(&filename)?;
    let records = import::parse_records(format, &bytes)?;
    if records.is_empty() {
        return Err(AppError::Validation(
            "No valid data found in the file.".to_owned(),
        ));
    }

    let imported = contacts::bulk_create(state.pool(), current.id, &records).await?;

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            success: true,
            message: "Contacts imported successfully!".to_owned(),
            imported,
        }),
    ))
}
