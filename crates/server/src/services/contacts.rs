//! Contact operations: CRUD, tag attachment, bulk import and the search and
//! aggregation queries.

use std::collections::BTreeMap;

use serde::Deserialize;
use sqlx::SqlitePool;

use rolodex_core::{ContactId, TagId, UserId};

use crate::db::{ContactRepository, NewContact, TagRepository};
use crate::error::AppError;
use crate::models::{Contact, ContactDetail, NameField, TagWithCount};
use crate::services::import::ImportRecord;

/// Default number of tags considered by [`most_common_tags`].
const DEFAULT_TAG_LIMIT: i64 = 10;

/// Payload for creating or updating a contact.
///
/// On create, `first_name` and `last_name` are required. On update, absent
/// fields keep their current values (merge semantics) and a present `tags`
/// list replaces the whole tag set.
#[derive(Debug, Default, Deserialize)]
pub struct ContactInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub mobile: Option<String>,
    pub comment: Option<String>,
    pub custom_fields: Option<BTreeMap<String, String>>,
    pub tags: Option<Vec<TagId>>,
}

/// Create a contact for `owner`, linking any of the given tags that exist
/// and belong to `owner`. Unresolvable tag ids are skipped silently.
///
/// # Errors
///
/// `Validation` when a required name is missing or blank.
pub async fn create_contact(
    pool: &SqlitePool,
    owner: UserId,
    input: ContactInput,
) -> Result<ContactDetail, AppError> {
    let values = NewContact {
        first_name: required_name(input.first_name, "first_name")?,
        last_name: required_name(input.last_name, "last_name")?,
        company_name: input.company_name,
        address: input.address,
        phone: input.phone,
        email: input.email,
        fax: input.fax,
        mobile: input.mobile,
        comment: input.comment,
        custom_fields: input.custom_fields.unwrap_or_default(),
    };

    let tag_ids = resolve_tags(pool, owner, input.tags.as_deref()).await?;
    let contact = ContactRepository::new(pool)
        .insert(owner, &values, tag_ids.as_deref().unwrap_or(&[]))
        .await?;

    detail(pool, contact).await
}

/// Fetch one contact with its tags.
///
/// # Errors
///
/// `NotFound` when absent, `Forbidden` when owned by another user.
pub async fn get_contact(
    pool: &SqlitePool,
    owner: UserId,
    id: ContactId,
) -> Result<ContactDetail, AppError> {
    let contact = require_owned(pool, owner, id).await?;
    detail(pool, contact).await
}

/// Update a contact with merge semantics; a present `tags` list replaces
/// the tag set (clear-then-reattach), silently skipping unresolvable ids.
///
/// # Errors
///
/// `NotFound`/`Forbidden` per ownership, `Validation` when a required name
/// is set to blank.
pub async fn update_contact(
    pool: &SqlitePool,
    owner: UserId,
    id: ContactId,
    input: ContactInput,
) -> Result<ContactDetail, AppError> {
    let existing = require_owned(pool, owner, id).await?;

    let values = NewContact {
        first_name: match input.first_name {
            None => existing.first_name,
            provided => required_name(provided, "first_name")?,
        },
        last_name: match input.last_name {
            None => existing.last_name,
            provided => required_name(provided, "last_name")?,
        },
        company_name: input.company_name.or(existing.company_name),
        address: input.address.or(existing.address),
        phone: input.phone.or(existing.phone),
        email: input.email.or(existing.email),
        fax: input.fax.or(existing.fax),
        mobile: input.mobile.or(existing.mobile),
        comment: input.comment.or(existing.comment),
        custom_fields: input.custom_fields.unwrap_or(existing.custom_fields),
    };

    let replace_tags = resolve_tags(pool, owner, input.tags.as_deref()).await?;
    let contact = ContactRepository::new(pool)
        .update(id, &values, replace_tags.as_deref())
        .await?;

    detail(pool, contact).await
}

/// Delete a contact; its association rows cascade away.
///
/// # Errors
///
/// `NotFound` when absent, `Forbidden` when owned by another user.
pub async fn delete_contact(
    pool: &SqlitePool,
    owner: UserId,
    id: ContactId,
) -> Result<(), AppError> {
    require_owned(pool, owner, id).await?;
    ContactRepository::new(pool).delete(id).await?;
    Ok(())
}

/// List the owner's contacts, optionally restricted to one tag.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn list_contacts(
    pool: &SqlitePool,
    owner: UserId,
    tag: Option<TagId>,
) -> Result<Vec<ContactDetail>, AppError> {
    let contacts = ContactRepository::new(pool).list_for_user(owner, tag).await?;
    details(pool, contacts).await
}

/// Persist a batch of parsed import records, all-or-nothing.
///
/// Every record is validated before anything is written; the first invalid
/// record aborts the whole batch. Unknown fields are ignored.
///
/// # Errors
///
/// `Validation` naming the first failing record.
pub async fn bulk_create(
    pool: &SqlitePool,
    owner: UserId,
    records: &[ImportRecord],
) -> Result<u64, AppError> {
    let mut values = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let contact = record_to_contact(record)
            .map_err(|msg| AppError::Validation(format!("record {}: {msg}", index + 1)))?;
        values.push(contact);
    }

    Ok(ContactRepository::new(pool).bulk_insert(owner, &values).await?)
}

/// Exact-match search on the provided name fields.
///
/// # Errors
///
/// `Validation` when neither field is given.
pub async fn search_by_name(
    pool: &SqlitePool,
    owner: UserId,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<Vec<ContactDetail>, AppError> {
    let first_name = first_name.map(str::trim).filter(|s| !s.is_empty());
    let last_name = last_name.map(str::trim).filter(|s| !s.is_empty());
    if first_name.is_none() && last_name.is_none() {
        return Err(AppError::Validation(
            "Provide first_name or last_name to search".to_owned(),
        ));
    }

    let contacts = ContactRepository::new(pool)
        .search_exact(owner, first_name, last_name)
        .await?;
    details(pool, contacts).await
}

/// Case-insensitive substring search over first and last name.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn text_search(
    pool: &SqlitePool,
    owner: UserId,
    needle: &str,
) -> Result<Vec<ContactDetail>, AppError> {
    let contacts = ContactRepository::new(pool)
        .search_text(owner, needle.trim())
        .await?;
    details(pool, contacts).await
}

/// Contacts whose first or last name occurs more than once among the
/// owner's contacts.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn duplicates_by_field(
    pool: &SqlitePool,
    owner: UserId,
    field: NameField,
) -> Result<Vec<ContactDetail>, AppError> {
    let contacts = ContactRepository::new(pool).duplicates_by(owner, field).await?;
    details(pool, contacts).await
}

/// The owner's most used tags and the contacts linked to any of them.
///
/// # Errors
///
/// Propagates storage failures.
pub async fn most_common_tags(
    pool: &SqlitePool,
    owner: UserId,
    limit: Option<i64>,
) -> Result<(Vec<TagWithCount>, Vec<ContactDetail>), AppError> {
    let limit = limit.unwrap_or(DEFAULT_TAG_LIMIT).clamp(1, 100);

    let ranking = TagRepository::new(pool).usage_ranking(owner, limit).await?;
    let tag_ids: Vec<TagId> = ranking.iter().map(|t| t.tag.id).collect();

    let contacts = ContactRepository::new(pool)
        .linked_to_tags(owner, &tag_ids)
        .await?;
    let contacts = details(pool, contacts).await?;

    Ok((ranking, contacts))
}

/// Fetch a contact, mapping absence to `NotFound` and foreign ownership to
/// `Forbidden`. The ownership check always precedes any mutation.
async fn require_owned(
    pool: &SqlitePool,
    owner: UserId,
    id: ContactId,
) -> Result<Contact, AppError> {
    let contact = ContactRepository::new(pool)
        .fetch(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Contact not found".to_owned()))?;
    if contact.user_id != owner {
        return Err(AppError::Forbidden(
            "Contact belongs to another user".to_owned(),
        ));
    }
    Ok(contact)
}

/// Resolve a requested tag list to ids that exist and belong to `owner`.
/// `None` means "tags not mentioned" and is passed through.
async fn resolve_tags(
    pool: &SqlitePool,
    owner: UserId,
    requested: Option<&[TagId]>,
) -> Result<Option<Vec<TagId>>, AppError> {
    match requested {
        None => Ok(None),
        Some(ids) => Ok(Some(TagRepository::new(pool).resolve_owned(owner, ids).await?)),
    }
}

async fn detail(pool: &SqlitePool, contact: Contact) -> Result<ContactDetail, AppError> {
    let tags = ContactRepository::new(pool).tags_of(contact.id).await?;
    Ok(ContactDetail { contact, tags })
}

/// Assemble details for a batch of contacts with one association query.
async fn details(
    pool: &SqlitePool,
    contacts: Vec<Contact>,
) -> Result<Vec<ContactDetail>, AppError> {
    let ids: Vec<ContactId> = contacts.iter().map(|c| c.id).collect();
    let mut tag_map = ContactRepository::new(pool).tags_for_contacts(&ids).await?;

    Ok(contacts
        .into_iter()
        .map(|contact| {
            let tags = tag_map.remove(&contact.id).unwrap_or_default();
            ContactDetail { contact, tags }
        })
        .collect())
}

fn required_name(value: Option<String>, field: &str) -> Result<String, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

/// Map an import record's known fields onto contact columns; anything else
/// is ignored.
fn record_to_contact(record: &ImportRecord) -> Result<NewContact, String> {
    let required = |field: &str| -> Result<String, String> {
        record
            .get(field)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(ToOwned::to_owned)
            .ok_or_else(|| format!("{field} is required"))
    };
    let optional = |field: &str| record.get(field).cloned();

    Ok(NewContact {
        first_name: required("first_name")?,
        last_name: required("last_name")?,
        company_name: optional("company_name"),
        address: optional("address"),
        phone: optional("phone"),
        email: optional("email"),
        fax: optional("fax"),
        mobile: optional("mobile"),
        comment: optional("comment"),
        custom_fields: BTreeMap::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::test_support::{memory_pool, seed_user};
    use crate::services::import::{ImportFormat, parse_records};
    use crate::services::tags::{CreateTagInput, create_tag};

    fn minimal(first: &str, last: &str) -> ContactInput {
        ContactInput {
            first_name: Some(first.to_owned()),
            last_name: Some(last.to_owned()),
            ..ContactInput::default()
        }
    }

    async fn tag(pool: &SqlitePool, owner: UserId, name: &str) -> TagId {
        create_tag(
            pool,
            owner,
            CreateTagInput {
                name: name.to_owned(),
                color: None,
                parent_id: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_create_then_get_returns_equal_fields() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        let mut input = minimal("Ada", "Lovelace");
        input.phone = Some("555-0100".to_owned());
        input.custom_fields = Some(BTreeMap::from([(
            "birthday".to_owned(),
            "1815-12-10".to_owned(),
        )]));

        let created = create_contact(&pool, user.id, input).await.unwrap();
        let fetched = get_contact(&pool, user.id, created.contact.id).await.unwrap();

        assert_eq!(fetched.contact.first_name, "Ada");
        assert_eq!(fetched.contact.phone.as_deref(), Some("555-0100"));
        assert_eq!(fetched.contact.custom_fields["birthday"], "1815-12-10");
    }

    #[tokio::test]
    async fn test_create_requires_names() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        let err = create_contact(
            &pool,
            user.id,
            ContactInput {
                first_name: Some("Ada".to_owned()),
                ..ContactInput::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("last_name")));
    }

    #[tokio::test]
    async fn test_create_silently_skips_unresolvable_tags() {
        let pool = memory_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let mine = tag(&pool, alice.id, "mine").await;
        let foreign = tag(&pool, bob.id, "foreign").await;

        let mut input = minimal("Ada", "Lovelace");
        input.tags = Some(vec![mine, foreign, TagId::new(999)]);

        let created = create_contact(&pool, alice.id, input).await.unwrap();
        let ids: Vec<TagId> = created.tags.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![mine]);
    }

    #[tokio::test]
    async fn test_update_merges_untouched_fields() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        let mut input = minimal("Ada", "Lovelace");
        input.company_name = Some("Analytical Engines Ltd".to_owned());
        let created = create_contact(&pool, user.id, input).await.unwrap();

        let updated = update_contact(
            &pool,
            user.id,
            created.contact.id,
            ContactInput {
                comment: Some("met at the salon".to_owned()),
                ..ContactInput::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.contact.comment.as_deref(), Some("met at the salon"));
        assert_eq!(updated.contact.first_name, "Ada");
        assert_eq!(
            updated.contact.company_name.as_deref(),
            Some("Analytical Engines Ltd")
        );
    }

    #[tokio::test]
    async fn test_update_replaces_tag_set() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        let work = tag(&pool, user.id, "work").await;
        let friends = tag(&pool, user.id, "friends").await;

        let mut input = minimal("Ada", "Lovelace");
        input.tags = Some(vec![work]);
        let created = create_contact(&pool, user.id, input).await.unwrap();

        // Overlapping replacement: still exactly one row per tag.
        let updated = update_contact(
            &pool,
            user.id,
            created.contact.id,
            ContactInput {
                tags: Some(vec![friends, friends, work]),
                ..ContactInput::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.tags.len(), 2);

        // Empty list clears all tags.
        let cleared = update_contact(
            &pool,
            user.id,
            created.contact.id,
            ContactInput {
                tags: Some(Vec::new()),
                ..ContactInput::default()
            },
        )
        .await
        .unwrap();
        assert!(cleared.tags.is_empty());
    }

    #[tokio::test]
    async fn test_cross_owner_access_is_forbidden() {
        let pool = memory_pool().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let created = create_contact(&pool, alice.id, minimal("Ada", "Lovelace"))
            .await
            .unwrap();

        let err = get_contact(&pool, bob.id, created.contact.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = delete_contact(&pool, bob.id, created.contact.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        // Still there for Alice.
        assert!(get_contact(&pool, alice.id, created.contact.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_bulk_create_from_csv_records() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        let bytes =
            b"first_name,last_name,email\nAda,Lovelace,ada@example.com\nGrace,Hopper,grace@example.com\nAlan,Turing,alan@example.com\n";
        let records = parse_records(ImportFormat::Csv, bytes).unwrap();

        let imported = bulk_create(&pool, user.id, &records).await.unwrap();
        assert_eq!(imported, 3);

        let all = list_contacts(&pool, user.id, None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|c| c.contact.custom_fields.is_empty()));
        assert_eq!(all[0].contact.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_bulk_create_is_all_or_nothing() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        let bytes = b"first_name,last_name\nAda,Lovelace\n,Hopper\n";
        let records = parse_records(ImportFormat::Csv, bytes).unwrap();

        let err = bulk_create(&pool, user.id, &records).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("record 2")));

        // Nothing was persisted.
        assert!(list_contacts(&pool, user.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_by_name_exact_match() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        create_contact(&pool, user.id, minimal("Ada", "Lovelace")).await.unwrap();
        create_contact(&pool, user.id, minimal("Ada", "Byron")).await.unwrap();

        let hits = search_by_name(&pool, user.id, Some("Ada"), None).await.unwrap();
        assert_eq!(hits.len(), 2);

        let hits = search_by_name(&pool, user.id, Some("Ada"), Some("Byron"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].contact.last_name, "Byron");

        assert!(search_by_name(&pool, user.id, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_most_common_tags_ranks_by_usage() {
        let pool = memory_pool().await;
        let user = seed_user(&pool, "alice").await;

        let popular = tag(&pool, user.id, "popular").await;
        let rare = tag(&pool, user.id, "rare").await;

        for (first, tags) in [
            ("Ada", vec![popular, rare]),
            ("Grace", vec![popular]),
            ("Alan", vec![popular]),
            ("Edsger", vec![]),
        ] {
            let mut input = minimal(first, "X");
            input.tags = Some(tags);
            create_contact(&pool, user.id, input).await.unwrap();
        }

        let (ranking, contacts) = most_common_tags(&pool, user.id, Some(1)).await.unwrap();
        assert_eq!(ranking.len(), 1);
        assert_eq!(ranking[0].tag.id, popular);
        assert_eq!(ranking[0].contact_count, 3);

        // Contacts linked to the top tag; the untagged one is excluded.
        assert_eq!(contacts.len(), 3);
        assert!(contacts.iter().all(|c| c.contact.first_name != "Edsger"));
    }
}
