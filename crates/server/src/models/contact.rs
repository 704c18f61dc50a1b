//! Contact domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rolodex_core::{ContactId, UserId};

use super::tag::Tag;

/// A contact (domain type).
///
/// Only `first_name` and `last_name` are required; everything else is
/// free-form. `custom_fields` is an open string-to-string mapping for
/// whatever the user wants to track beyond the fixed columns.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    /// Unique contact ID.
    pub id: ContactId,
    /// Owning user; immutable after creation.
    #[serde(skip_serializing)]
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub company_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub fax: Option<String>,
    pub mobile: Option<String>,
    pub comment: Option<String>,
    /// Open mapping of user-defined fields, empty by default.
    pub custom_fields: BTreeMap<String, String>,
    #[serde(skip_serializing)]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub updated_at: DateTime<Utc>,
}

/// A contact together with its tag summaries - the full API representation:
/// `{id, first_name, ..., custom_fields, tags: [{id, name, color, parent_id}]}`.
#[derive(Debug, Clone, Serialize)]
pub struct ContactDetail {
    #[serde(flatten)]
    pub contact: Contact,
    pub tags: Vec<Tag>,
}

/// The contact name columns that aggregation queries may group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameField {
    FirstName,
    LastName,
}

impl NameField {
    /// The corresponding column name.
    ///
    /// Returning a static string from a closed enum keeps query
    /// construction safe from injection.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
        }
    }
}

impl std::str::FromStr for NameField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first_name" => Ok(Self::FirstName),
            "last_name" => Ok(Self::LastName),
            other => Err(format!(
                "field must be first_name or last_name, got {other:?}"
            )),
        }
    }
}
