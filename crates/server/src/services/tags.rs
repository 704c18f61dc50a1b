//! Tag operations: create, list, update, delete.
//!
//! Tags belong to exactly one user and may form a tree through `parent_id`.
//! The service enforces what the storage layer cannot: parent ownership and
//! acyclicity.

use serde::{Deserialize, Deserializer};
use sqlx::SqlitePool;

use rolodex_core::{TagColor, TagId, UserId};

use crate::db::{RepositoryError, TagRepository};
use crate::error::AppError;
use crate::models::{Tag, TagWithCount};

/// Payload for creating a tag.
#[derive(Debug, Deserialize)]
pub struct CreateTagInput {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub parent_id: Option<TagId>,
}

/// Payload for updating a tag; absent fields are left unchanged.
///
/// `parent_id` distinguishes three states: absent (keep), `null` (detach
/// from the parent), and a tag id (re-parent).
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTagInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub parent_id: Option<Option<TagId>>,
}

/// Deserialize a field where `null` must stay distinguishable from an
/// absent field: absent -> `None` (via `#[serde(default)]`), `null` ->
/// `Some(None)`, value -> `Some(Some(v))`.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create a tag for `owner`.
///
/// # Errors
///
/// `Validation` for a blank name or malformed color, `NotFound` when the
/// parent does not exist or belongs to someone else, `Conflict` when the
/// owner already has a tag with this name.
pub async fn create_tag(
    pool: &SqlitePool,
    owner: UserId,
    input: CreateTagInput,
) -> Result<Tag, AppError> {
    let name = validate_name(&input.name)?;
    let color = parse_color(input.color.as_deref())?;

    let repo = TagRepository::new(pool);
    if let Some(parent_id) = input.parent_id {
        require_owned_parent(&repo, owner, parent_id).await?;
    }

    match repo.insert(owner, &name, &color, input.parent_id).await {
        Ok(tag) => Ok(tag),
        Err(RepositoryError::Conflict(_)) => {
            Err(AppError::Conflict("Tag name must be unique.".to_owned()))
        }
        Err(e) => Err(e.into()),
    }
}

/// All tags owned by `owner`, with usage counts.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn list_tags(pool: &SqlitePool, owner: UserId) -> Result<Vec<TagWithCount>, AppError> {
    Ok(TagRepository::new(pool).list_with_counts(owner).await?)
}

/// Update a tag with merge semantics.
///
/// # Errors
///
/// `NotFound`/`Forbidden` per ownership, `Validation` when the change would
/// make the tag its own ancestor, `Conflict` on a name collision.
pub async fn update_tag(
    pool: &SqlitePool,
    owner: UserId,
    tag_id: TagId,
    input: UpdateTagInput,
) -> Result<Tag, AppError> {
    let repo = TagRepository::new(pool);
    let tag = require_owned(&repo, owner, tag_id).await?;

    let name = match input.name {
        None => tag.name,
        Some(raw) => validate_name(&raw)?,
    };
    let color = match input.color {
        None => tag.color,
        Some(raw) => parse_color(Some(&raw))?,
    };
    let parent_id = match input.parent_id {
        None => tag.parent_id,
        Some(None) => None,
        Some(Some(parent_id)) => {
            require_owned_parent(&repo, owner, parent_id).await?;
            ensure_acyclic(&repo, owner, tag_id, parent_id).await?;
            Some(parent_id)
        }
    };

    match repo.update(tag_id, &name, &color, parent_id).await {
        Ok(tag) => Ok(tag),
        Err(RepositoryError::Conflict(_)) => {
            Err(AppError::Conflict("Tag name must be unique.".to_owned()))
        }
        Err(RepositoryError::NotFound) => Err(AppError::NotFound("Tag not found".to_owned())),
        Err(e) => Err(e.into()),
    }
}

/// Delete a tag and its association rows. Child tags become root tags.
///
/// # Errors
///
/// `NotFound` when absent, `Forbidden` when owned by another user.
pub async fn delete_tag(pool: &SqlitePool, owner: UserId, tag_id: TagId) -> Result<(), AppError> {
    let repo = TagRepository::new(pool);
    require_owned(&repo, owner, tag_id).await?;
    repo.delete(tag_id).await?;
    Ok(())
}

/// Fetch a tag, mapping absence to `NotFound` and foreign ownership to
/// `Forbidden`. The ownership check always precedes any mutation.
async fn require_owned(
    repo: &TagRepository<'_>,
    owner: UserId,
    tag_id: TagId,
) -> Result<Tag, AppError> {
    let tag = repo
        .find_by_id(tag_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_owned()))?;
    if tag.user_id != owner {
        return Err(AppError::Forbidden("Tag belongs to another user".to_owned()));
    }
    Ok(tag)
}

/// A parent reference must point at an existing tag of the same owner.
/// Foreign tags read as absent, so no existence information leaks.
async fn require_owned_parent(
    repo: &TagRepository<'_>,
    owner: UserId,
    parent_id: TagId,
) -> Result<(), AppError> {
    match repo.find_by_id(parent_id).await? {
        Some(parent) if parent.user_id == owner => Ok(()),
        _ => Err(AppError::NotFound("Parent tag not found".to_owned())),
    }
}

/// Reject a re-parenting that would make `tag_id` its own ancestor.
async fn ensure_acyclic(
    repo: &TagRepository<'_>,
    owner: UserId,
    tag_id: TagId,
    new_parent: TagId,
) -> Result<(), AppError> {
    let parents = repo.parent_map(owner).await?;

    // Walk up from the proposed parent. The iteration cap guards against a
    // pre-existing cycle in stored data.
    let mut cursor = Some(new_parent);
    for _ in 0..=parents.len() {
        let Some(current) = cursor else {
            return Ok(());
        };
        if current == tag_id {
            return Err(AppError::Validation(
                "A tag cannot be its own ancestor".to_owned(),
            ));
        }
        cursor = parents.get(&current).copied().flatten();
    }
    Err(AppError::Validation(
        "A tag cannot be its own ancestor".to_owned(),
    ))
}

fn validate_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Tag name is required".to_owned()));
    }
    Ok(name.to_owned())
}

fn parse_color(raw: Option<&str>) -> Result<TagColor, AppError> {
    match raw {
        None => Ok(TagColor::default()),
        Some(s) => TagColor::parse(s)
            .map_err(|e| AppError::Validation(format!("Invalid color: {e}"))),
    }
}
