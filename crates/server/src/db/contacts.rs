//! Contact repository for database operations.
//!
//! Multi-statement writes (contact plus association rows, bulk imports) run
//! inside a single transaction so a failure never leaves orphaned rows.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use rolodex_core::{ContactId, TagId, UserId};

use super::RepositoryError;
use super::tags::TagRow;
use crate::models::{Contact, NameField, Tag};

/// Column values for a contact insert or full-row update.
///
/// The service layer computes these (applying merge semantics for updates)
/// before calling into the repository.
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub mobile: Option<String>,
    pub comment: Option<String>,
    pub custom_fields: BTreeMap<String, String>,
}

/// Internal row type for contact queries.
#[derive(Debug, sqlx::FromRow)]
struct ContactRow {
    id: i32,
    user_id: i32,
    first_name: String,
    last_name: String,
    company_name: Option<String>,
    address: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    fax: Option<String>,
    mobile: Option<String>,
    comment: Option<String>,
    custom_fields: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContactRow> for Contact {
    type Error = RepositoryError;

    fn try_from(row: ContactRow) -> Result<Self, Self::Error> {
        let custom_fields: BTreeMap<String, String> = serde_json::from_str(&row.custom_fields)
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid custom_fields JSON: {e}"))
            })?;

        Ok(Self {
            id: ContactId::new(row.id),
            user_id: UserId::new(row.user_id),
            first_name: row.first_name,
            last_name: row.last_name,
            company_name: row.company_name,
            address: row.address,
            phone: row.phone,
            email: row.email,
            fax: row.fax,
            mobile: row.mobile,
            comment: row.comment,
            custom_fields,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Internal row type for tags joined through the association table.
#[derive(Debug, sqlx::FromRow)]
struct ContactTagsRow {
    contact_id: i32,
    #[sqlx(flatten)]
    tag: TagRow,
}

fn encode_custom_fields(
    custom_fields: &BTreeMap<String, String>,
) -> Result<String, RepositoryError> {
    serde_json::to_string(custom_fields)
        .map_err(|e| RepositoryError::DataCorruption(format!("unencodable custom_fields: {e}")))
}

/// Repository for contact database operations.
pub struct ContactRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a contact and link it to the given (already resolved) tags.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement in the transaction fails; nothing
    /// is persisted in that case.
    pub async fn insert(
        &self,
        owner: UserId,
        values: &NewContact,
        tag_ids: &[TagId],
    ) -> Result<Contact, RepositoryError> {
        let custom_fields = encode_custom_fields(&values.custom_fields)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            INSERT INTO contacts (
                user_id, first_name, last_name, company_name, address, phone,
                email, fax, mobile, comment, custom_fields, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            RETURNING id, user_id, first_name, last_name, company_name, address, phone,
                      email, fax, mobile, comment, custom_fields, created_at, updated_at
            "#,
        )
        .bind(owner)
        .bind(&values.first_name)
        .bind(&values.last_name)
        .bind(&values.company_name)
        .bind(&values.address)
        .bind(&values.phone)
        .bind(&values.email)
        .bind(&values.fax)
        .bind(&values.mobile)
        .bind(&values.comment)
        .bind(&custom_fields)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let contact: Contact = row.try_into()?;
        attach_tags(&mut tx, contact.id, tag_ids).await?;

        tx.commit().await?;
        Ok(contact)
    }

    /// Look up a contact by ID, regardless of owner.
    ///
    /// Callers distinguish "absent" from "foreign" by inspecting
    /// `contact.user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn fetch(&self, id: ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, user_id, first_name, last_name, company_name, address, phone,
                   email, fax, mobile, comment, custom_fields, created_at, updated_at
            FROM contacts
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Write all mutable columns of a contact and, when `replace_tags` is
    /// given, replace its tag set (clear-then-reattach) in the same
    /// transaction.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if the contact does not exist.
    pub async fn update(
        &self,
        id: ContactId,
        values: &NewContact,
        replace_tags: Option<&[TagId]>,
    ) -> Result<Contact, RepositoryError> {
        let custom_fields = encode_custom_fields(&values.custom_fields)?;
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ContactRow>(
            r#"
            UPDATE contacts
            SET first_name = ?1, last_name = ?2, company_name = ?3, address = ?4,
                phone = ?5, email = ?6, fax = ?7, mobile = ?8, comment = ?9,
                custom_fields = ?10, updated_at = ?11
            WHERE id = ?12
            RETURNING id, user_id, first_name, last_name, company_name, address, phone,
                      email, fax, mobile, comment, custom_fields, created_at, updated_at
            "#,
        )
        .bind(&values.first_name)
        .bind(&values.last_name)
        .bind(&values.company_name)
        .bind(&values.address)
        .bind(&values.phone)
        .bind(&values.email)
        .bind(&values.fax)
        .bind(&values.mobile)
        .bind(&values.comment)
        .bind(&custom_fields)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let contact: Contact = row.ok_or(RepositoryError::NotFound)?.try_into()?;

        if let Some(tag_ids) = replace_tags {
            sqlx::query("DELETE FROM contact_tags WHERE contact_id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            attach_tags(&mut tx, id, tag_ids).await?;
        }

        tx.commit().await?;
        Ok(contact)
    }

    /// Delete a contact. Association rows cascade away.
    ///
    /// Returns the number of deleted rows (0 when the contact was absent).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn delete(&self, id: ContactId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = ?1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// All contacts owned by `owner`, in insertion order. With `tag`, only
    /// contacts linked to that tag (inner join - untagged contacts are
    /// excluded).
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_user(
        &self,
        owner: UserId,
        tag: Option<TagId>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows = match tag {
            None => {
                sqlx::query_as::<_, ContactRow>(
                    r#"
                    SELECT id, user_id, first_name, last_name, company_name, address, phone,
                           email, fax, mobile, comment, custom_fields, created_at, updated_at
                    FROM contacts
                    WHERE user_id = ?1
                    ORDER BY id
                    "#,
                )
                .bind(owner)
                .fetch_all(self.pool)
                .await?
            }
            Some(tag_id) => {
                sqlx::query_as::<_, ContactRow>(
                    r#"
                    SELECT c.id, c.user_id, c.first_name, c.last_name, c.company_name,
                           c.address, c.phone, c.email, c.fax, c.mobile, c.comment,
                           c.custom_fields, c.created_at, c.updated_at
                    FROM contacts c
                    JOIN contact_tags ct ON ct.contact_id = c.id
                    WHERE c.user_id = ?1 AND ct.tag_id = ?2
                    ORDER BY c.id
                    "#,
                )
                .bind(owner)
                .bind(tag_id)
                .fetch_all(self.pool)
                .await?
            }
        };

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Insert many contacts in one transaction (no tags).
    ///
    /// Used by bulk import: either every record is persisted or none is.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; the transaction rolls back.
    pub async fn bulk_insert(
        &self,
        owner: UserId,
        records: &[NewContact],
    ) -> Result<u64, RepositoryError> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for values in records {
            let custom_fields = encode_custom_fields(&values.custom_fields)?;
            sqlx::query(
                r#"
                INSERT INTO contacts (
                    user_id, first_name, last_name, company_name, address, phone,
                    email, fax, mobile, comment, custom_fields, created_at, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                "#,
            )
            .bind(owner)
            .bind(&values.first_name)
            .bind(&values.last_name)
            .bind(&values.company_name)
            .bind(&values.address)
            .bind(&values.phone)
            .bind(&values.email)
            .bind(&values.fax)
            .bind(&values.mobile)
            .bind(&values.comment)
            .bind(&custom_fields)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(records.len() as u64)
    }

    /// Exact-match search on the provided name fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn search_exact(
        &self,
        owner: UserId,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, user_id, first_name, last_name, company_name, address, phone,
                   email, fax, mobile, comment, custom_fields, created_at, updated_at
            FROM contacts
            WHERE user_id = ?1
              AND (?2 IS NULL OR first_name = ?2)
              AND (?3 IS NULL OR last_name = ?3)
            ORDER BY id
            "#,
        )
        .bind(owner)
        .bind(first_name)
        .bind(last_name)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Case-insensitive substring search over first and last name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn search_text(
        &self,
        owner: UserId,
        needle: &str,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query_as::<_, ContactRow>(
            r#"
            SELECT id, user_id, first_name, last_name, company_name, address, phone,
                   email, fax, mobile, comment, custom_fields, created_at, updated_at
            FROM contacts
            WHERE user_id = ?1
              AND (first_name LIKE '%' || ?2 || '%' OR last_name LIKE '%' || ?2 || '%')
            ORDER BY id
            "#,
        )
        .bind(owner)
        .bind(needle)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Contacts whose value in `field` occurs more than once among the
    /// owner's contacts.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn duplicates_by(
        &self,
        owner: UserId,
        field: NameField,
    ) -> Result<Vec<Contact>, RepositoryError> {
        // The column name comes from a closed enum, never from user input.
        let column = field.column();
        let sql = format!(
            "SELECT id, user_id, first_name, last_name, company_name, address, phone, \
                    email, fax, mobile, comment, custom_fields, created_at, updated_at \
             FROM contacts \
             WHERE user_id = ?1 AND {column} IN ( \
                 SELECT {column} FROM contacts \
                 WHERE user_id = ?1 \
                 GROUP BY {column} \
                 HAVING COUNT(*) > 1 \
             ) \
             ORDER BY {column}, id"
        );

        let rows = sqlx::query_as::<_, ContactRow>(&sql)
            .bind(owner)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Contacts owned by `owner` linked to any of the given tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn linked_to_tags(
        &self,
        owner: UserId,
        tag_ids: &[TagId],
    ) -> Result<Vec<Contact>, RepositoryError> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT DISTINCT c.id, c.user_id, c.first_name, c.last_name, c.company_name, \
                    c.address, c.phone, c.email, c.fax, c.mobile, c.comment, \
                    c.custom_fields, c.created_at, c.updated_at \
             FROM contacts c \
             JOIN contact_tags ct ON ct.contact_id = c.id \
             WHERE c.user_id = ",
        );
        builder.push_bind(owner);
        builder.push(" AND ct.tag_id IN (");
        {
            let mut separated = builder.separated(", ");
            for id in tag_ids {
                separated.push_bind(*id);
            }
        }
        builder.push(") ORDER BY c.id");

        let rows: Vec<ContactRow> = builder.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Tags linked to one contact, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn tags_of(&self, id: ContactId) -> Result<Vec<Tag>, RepositoryError> {
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT t.id, t.user_id, t.name, t.color, t.parent_id, t.created_at, t.updated_at
            FROM tags t
            JOIN contact_tags ct ON ct.tag_id = t.id
            WHERE ct.contact_id = ?1
            ORDER BY t.id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Tags for a batch of contacts, keyed by contact ID.
    ///
    /// Contacts without tags are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn tags_for_contacts(
        &self,
        ids: &[ContactId],
    ) -> Result<HashMap<ContactId, Vec<Tag>>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT ct.contact_id, t.id, t.user_id, t.name, t.color, t.parent_id, \
                    t.created_at, t.updated_at \
             FROM contact_tags ct \
             JOIN tags t ON t.id = ct.tag_id \
             WHERE ct.contact_id IN (",
        );
        {
            let mut separated = builder.separated(", ");
            for id in ids {
                separated.push_bind(*id);
            }
        }
        builder.push(") ORDER BY ct.contact_id, t.id");

        let rows: Vec<ContactTagsRow> = builder.build_query_as().fetch_all(self.pool).await?;

        let mut map: HashMap<ContactId, Vec<Tag>> = HashMap::new();
        for row in rows {
            let contact_id = ContactId::new(row.contact_id);
            map.entry(contact_id).or_default().push(row.tag.try_into()?);
        }
        Ok(map)
    }
}

/// Link a contact to each tag in `tag_ids` within an open transaction.
///
/// `INSERT OR IGNORE` makes re-attaching an already linked tag (or a
/// duplicate id in the list) a no-op rather than a constraint error.
async fn attach_tags(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    contact_id: ContactId,
    tag_ids: &[TagId],
) -> Result<(), RepositoryError> {
    for tag_id in tag_ids {
        sqlx::query("INSERT OR IGNORE INTO contact_tags (contact_id, tag_id) VALUES (?1, ?2)")
            .bind(contact_id)
            .bind(*tag_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rolodex_core::TagColor;

    use super::*;
    use crate::db::TagRepository;
    use crate::db::test_support::{memory_pool, seed_user};

    fn named(first: &str, last: &str) -> NewContact {
        NewContact {
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            ..NewContact::default()
        }
    }

    #[tokio::test]
    async fn test_insert_with_tags_and_fetch() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;
        let tags = TagRepository::new(&pool);
        let contacts = ContactRepository::new(&pool);

        let work = tags
            .insert(user.id, "work", &TagColor::default(), None)
            .await
            .unwrap();

        let contact = contacts
            .insert(user.id, &named("Ada", "Lovelace"), &[work.id])
            .await
            .unwrap();

        let fetched = contacts.fetch(contact.id).await.unwrap().unwrap();
        assert_eq!(fetched.first_name, "Ada");
        assert!(fetched.custom_fields.is_empty());

        let linked = contacts.tags_of(contact.id).await.unwrap();
        assert_eq!(linked.len(), 1);
        assert_eq!(linked[0].id, work.id);
    }

    #[tokio::test]
    async fn test_list_filtered_by_tag_uses_inner_join() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;
        let tags = TagRepository::new(&pool);
        let contacts = ContactRepository::new(&pool);

        let friends = tags
            .insert(user.id, "friends", &TagColor::default(), None)
            .await
            .unwrap();

        let tagged = contacts
            .insert(user.id, &named("Ada", "Lovelace"), &[friends.id])
            .await
            .unwrap();
        contacts
            .insert(user.id, &named("Bob", "Untagged"), &[])
            .await
            .unwrap();

        let all = contacts.list_for_user(user.id, None).await.unwrap();
        assert_eq!(all.len(), 2);

        let filtered = contacts
            .list_for_user(user.id, Some(friends.id))
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, tagged.id);
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;
        let tags = TagRepository::new(&pool);
        let contacts = ContactRepository::new(&pool);

        let tag = tags
            .insert(user.id, "dup", &TagColor::default(), None)
            .await
            .unwrap();
        let contact = contacts
            .insert(user.id, &named("Ada", "Lovelace"), &[tag.id, tag.id])
            .await
            .unwrap();

        // Replacing with an overlapping set still yields one row.
        contacts
            .update(contact.id, &named("Ada", "Lovelace"), Some(&[tag.id]))
            .await
            .unwrap();

        let linked = contacts.tags_of(contact.id).await.unwrap();
        assert_eq!(linked.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_by_first_name() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;
        let contacts = ContactRepository::new(&pool);

        contacts.insert(user.id, &named("Al", "S"), &[]).await.unwrap();
        contacts.insert(user.id, &named("Al", "T"), &[]).await.unwrap();
        contacts.insert(user.id, &named("Bo", "U"), &[]).await.unwrap();

        let dupes = contacts
            .duplicates_by(user.id, NameField::FirstName)
            .await
            .unwrap();
        assert_eq!(dupes.len(), 2);
        assert!(dupes.iter().all(|c| c.first_name == "Al"));
    }

    #[tokio::test]
    async fn test_search_text_is_case_insensitive() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;
        let contacts = ContactRepository::new(&pool);

        contacts
            .insert(user.id, &named("Ada", "Lovelace"), &[])
            .await
            .unwrap();
        contacts
            .insert(user.id, &named("Grace", "Hopper"), &[])
            .await
            .unwrap();

        let hits = contacts.search_text(user.id, "lOvE").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].last_name, "Lovelace");
    }

    #[tokio::test]
    async fn test_bulk_insert_is_atomic() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;
        let contacts = ContactRepository::new(&pool);

        let inserted = contacts
            .bulk_insert(user.id, &[named("A", "B"), named("C", "D")])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(contacts.list_for_user(user.id, None).await.unwrap().len(), 2);
    }
}
