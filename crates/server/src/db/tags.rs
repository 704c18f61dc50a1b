//! Tag repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use rolodex_core::{TagColor, TagId, UserId};

use super::{RepositoryError, map_insert_error};
use crate::models::{Tag, TagWithCount};

/// Internal row type for tag queries. Shared with the contact repository,
/// which joins tags through the association table.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagRow {
    id: i32,
    user_id: i32,
    name: String,
    color: String,
    parent_id: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TagRow> for Tag {
    type Error = RepositoryError;

    fn try_from(row: TagRow) -> Result<Self, Self::Error> {
        let color = TagColor::parse(&row.color).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid tag color in database: {e}"))
        })?;

        Ok(Self {
            id: TagId::new(row.id),
            user_id: UserId::new(row.user_id),
            name: row.name,
            color,
            parent_id: row.parent_id.map(TagId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for tag queries carrying a usage count.
#[derive(Debug, sqlx::FromRow)]
struct TagCountRow {
    #[sqlx(flatten)]
    tag: TagRow,
    contact_count: i64,
}

impl TryFrom<TagCountRow> for TagWithCount {
    type Error = RepositoryError;

    fn try_from(row: TagCountRow) -> Result<Self, Self::Error> {
        Ok(Self {
            tag: row.tag.try_into()?,
            contact_count: row.contact_count,
        })
    }
}

/// Repository for tag database operations.
pub struct TagRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TagRepository<'a> {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new tag.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Conflict`] when the owner already has a
    /// tag with this name.
    pub async fn insert(
        &self,
        owner: UserId,
        name: &str,
        color: &TagColor,
        parent_id: Option<TagId>,
    ) -> Result<Tag, RepositoryError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            INSERT INTO tags (user_id, name, color, parent_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, user_id, name, color, parent_id, created_at, updated_at
            "#,
        )
        .bind(owner)
        .bind(name)
        .bind(color.as_str())
        .bind(parent_id)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(map_insert_error)?;

        row.try_into()
    }

    /// Look up a tag by ID, regardless of owner.
    ///
    /// Callers distinguish "absent" from "foreign" by inspecting
    /// `tag.user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_by_id(&self, id: TagId) -> Result<Option<Tag>, RepositoryError> {
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT id, user_id, name, color, parent_id, created_at, updated_at
            FROM tags
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// All tags owned by `owner` with their usage counts, in insertion
    /// order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_with_counts(
        &self,
        owner: UserId,
    ) -> Result<Vec<TagWithCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            r#"
            SELECT t.id, t.user_id, t.name, t.color, t.parent_id, t.created_at, t.updated_at,
                   COUNT(ct.contact_id) AS contact_count
            FROM tags t
            LEFT JOIN contact_tags ct ON ct.tag_id = t.id
            WHERE t.user_id = ?1
            GROUP BY t.id
            ORDER BY t.id
            "#,
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// The owner's tags ranked by usage count, most used first, capped at
    /// `limit`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn usage_ranking(
        &self,
        owner: UserId,
        limit: i64,
    ) -> Result<Vec<TagWithCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagCountRow>(
            r#"
            SELECT t.id, t.user_id, t.name, t.color, t.parent_id, t.created_at, t.updated_at,
                   COUNT(ct.contact_id) AS contact_count
            FROM tags t
            LEFT JOIN contact_tags ct ON ct.tag_id = t.id
            WHERE t.user_id = ?1
            GROUP BY t.id
            ORDER BY contact_count DESC, t.id
            LIMIT ?2
            "#,
        )
        .bind(owner)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Update a tag with the given final values.
    ///
    /// The caller (service layer) is responsible for merge semantics and
    /// cycle checks; this writes all mutable columns.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the tag does not exist and
    /// [`RepositoryError::Conflict`] on a name collision.
    pub async fn update(
        &self,
        id: TagId,
        name: &str,
        color: &TagColor,
        parent_id: Option<TagId>,
    ) -> Result<Tag, RepositoryError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, TagRow>(
            r#"
            UPDATE tags
            SET name = ?1, color = ?2, parent_id = ?3, updated_at = ?4
            WHERE id = ?5
            RETURNING id, user_id, name, color, parent_id, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(color.as_str())
        .bind(parent_id)
        .bind(now)
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(map_insert_error)?;

        row.ok_or(RepositoryError::NotFound)?.try_into()
    }

    /// Delete a tag.
    ///
    /// Association rows cascade away; child tags keep existing and become
    /// root tags (their `parent_id` is cleared by the schema).
    ///
    /// Returns the number of deleted rows (0 when the tag was absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn delete(&self, id: TagId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = ?1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// The owner's `tag id -> parent id` mapping, used for cycle detection.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn parent_map(
        &self,
        owner: UserId,
    ) -> Result<std::collections::HashMap<TagId, Option<TagId>>, RepositoryError> {
        let rows: Vec<(i32, Option<i32>)> =
            sqlx::query_as("SELECT id, parent_id FROM tags WHERE user_id = ?1")
                .bind(owner)
                .fetch_all(self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(id, parent)| (TagId::new(id), parent.map(TagId::new)))
            .collect())
    }

    /// Filter `ids` down to tags that exist and are owned by `owner`.
    ///
    /// Unresolvable ids are dropped silently; the result preserves no
    /// particular order and contains no duplicates.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn resolve_owned(
        &self,
        owner: UserId,
        ids: &[TagId],
    ) -> Result<Vec<TagId>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT id FROM tags WHERE user_id = ");
        builder.push_bind(owner);
        builder.push(" AND id IN (");
        {
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
        }
        builder.push(")");

        let rows: Vec<(i32,)> = builder.build_query_as().fetch_all(self.pool).await?;
        Ok(rows.into_iter().map(|(id,)| TagId::new(id)).collect())
    }
}
