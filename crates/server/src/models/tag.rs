//! Tag domain types.
//!
//! Tags are owned by a user and may reference a parent tag, forming a tree.
//! The serialized shape is `{id, name, color, parent_id}` - ownership and
//! timestamps are internal.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rolodex_core::{TagColor, TagId, UserId};

/// A tag (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    /// Unique tag ID.
    pub id: TagId,
    /// Owning user.
    #[serde(skip_serializing)]
    pub user_id: UserId,
    /// Tag name, unique per owner.
    pub name: String,
    /// Display color.
    pub color: TagColor,
    /// Optional parent tag; `None` for root tags.
    pub parent_id: Option<TagId>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

/// A tag together with the number of contacts linked to it.
#[derive(Debug, Clone, Serialize)]
pub struct TagWithCount {
    #[serde(flatten)]
    pub tag: Tag,
    /// Number of contact associations.
    pub contact_count: i64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_tag() -> Tag {
        Tag {
            id: TagId::new(3),
            user_id: UserId::new(1),
            name: "family".to_owned(),
            color: TagColor::parse("#FF5733").unwrap(),
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample_tag()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 3,
                "name": "family",
                "color": "#FF5733",
                "parent_id": null,
            })
        );
    }

    #[test]
    fn test_count_flattens_into_tag() {
        let with_count = TagWithCount {
            tag: sample_tag(),
            contact_count: 4,
        };
        let json = serde_json::to_value(with_count).unwrap();
        assert_eq!(json["contact_count"], 4);
        assert_eq!(json["name"], "family");
    }
}
