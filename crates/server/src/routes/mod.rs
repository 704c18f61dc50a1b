//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness check
//! GET    /health/ready                    - Readiness check (pings the database)
//!
//! # Auth
//! POST   /api/register                    - Create an account
//! POST   /api/login                       - Start a session
//! POST   /api/logout                      - End the session
//!
//! # Profile
//! GET    /api/profile                     - Current user's profile
//! PUT    /api/profile                     - Update profile (merge semantics)
//! DELETE /api/delete_account              - Delete the account and all owned data
//!
//! # Contacts
//! GET    /api/contacts                    - List (optional ?tag_id= filter)
//! POST   /api/contacts                    - Create
//! GET    /api/contacts/filter?tag_id=     - Filter by tag
//! GET    /api/contacts/search             - Exact match on first/last name
//! GET    /api/contacts/text_search?q=     - Substring match on names
//! GET    /api/contacts/duplicates?field=  - Contacts sharing a name value
//! GET    /api/contacts/most_common_tags   - Top tags and their contacts
//! POST   /api/contacts/import             - Bulk import (multipart CSV/JSON/Excel)
//! GET    /api/contacts/{id}               - Fetch one
//! PUT    /api/contacts/{id}               - Update (merge semantics)
//! DELETE /api/contacts/{id}               - Delete
//!
//! # Tags
//! GET    /api/tags                        - List with usage counts
//! POST   /api/tags                        - Create
//! PUT    /api/tags/{id}                   - Update (merge semantics)
//! DELETE /api/tags/{id}                   - Delete (children become roots)
//! ```
//!
//! Every response is a JSON envelope: `{"success": true, ...}` on success,
//! `{"success": false, "error": "..."}` on failure.

pub mod auth;
pub mod contacts;
pub mod profile;
pub mod tags;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::state::AppState;

/// Assemble all application routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(auth::router())
        .merge(profile::router())
        .merge(contacts::router())
        .merge(tags::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
