//! Wishlist keyword.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Keyword`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum KeywordError {
    #[error("keyword cannot be empty")]
    Empty,
    #[error("keyword must be at most {max} characters")]
    TooLong { max: usize },
}

/// A free-text wishlist keyword, trimmed and lowercased.
///
/// Keywords are unique by value within a wishlist, so the normalised form is
/// what gets stored and compared.
///
/// ```
/// use shelfwise_core::Keyword;
///
/// assert_eq!(Keyword::parse("Vintage ").unwrap().as_str(), "vintage");
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Keyword(String);

impl Keyword {
    /// Maximum keyword length in characters.
    pub const MAX_LENGTH: usize = 100;

    /// Parse and normalise a keyword.
    ///
    /// # Errors
    ///
    /// Returns an error if the keyword is blank or longer than
    /// [`Keyword::MAX_LENGTH`] characters after trimming.
    pub fn parse(s: &str) -> Result<Self, KeywordError> {
        let normalised = s.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(KeywordError::Empty);
        }
        if normalised.chars().count() > Self::MAX_LENGTH {
            return Err(KeywordError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(normalised))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Keyword {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl_pg_text!(Keyword);
