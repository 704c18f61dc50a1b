//! Tag color type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`TagColor`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// The input does not start with `#`.
    #[error("color must start with '#'")]
    MissingHash,
    /// The input is not exactly 7 characters (`#RRGGBB`).
    #[error("color must be a 7-character hex code like #FF5733")]
    BadLength,
    /// The input contains non-hexadecimal digits.
    #[error("color must contain only hex digits after '#'")]
    BadDigit,
}

/// A tag display color as a `#RRGGBB` hex code.
///
/// Stored and serialized as the uppercase hex string. The default color is
/// white (`#FFFFFF`), matching what the web UI assigns to new tags.
///
/// ```
/// use rolodex_core::TagColor;
///
/// assert!(TagColor::parse("#FF5733").is_ok());
/// assert!(TagColor::parse("red").is_err());
/// assert_eq!(TagColor::default().as_str(), "#FFFFFF");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TagColor(String);

impl TagColor {
    /// Parse a `TagColor` from a `#RRGGBB` string.
    ///
    /// Accepts lowercase or uppercase hex digits; the stored value is
    /// normalized to uppercase.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not a `#` followed by exactly six
    /// hex digits.
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        let rest = s.strip_prefix('#').ok_or(ColorError::MissingHash)?;

        if rest.len() != 6 {
            return Err(ColorError::BadLength);
        }

        if !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::BadDigit);
        }

        Ok(Self(format!("#{}", rest.to_ascii_uppercase())))
    }

    /// Returns the color as a `#RRGGBB` string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `TagColor` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Default for TagColor {
    fn default() -> Self {
        Self("#FFFFFF".to_owned())
    }
}

impl fmt::Display for TagColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TagColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TagColor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
