//! PSA certificate number.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CertNumberError {
    #[error("certificate number must contain only digits")]
    NotNumeric,
    #[error("certificate number must be {min} to {max} digits")]
    BadLength { min: usize, max: usize },
}

/// A grading authority's certificate number for one slabbed card.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CertNumber(String);

impl CertNumber {
    pub const MIN_DIGITS: usize = 6;
    pub const MAX_DIGITS: usize = 10;

    /// Parse a certificate number, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not all ASCII digits or has the
    /// wrong number of digits.
    pub fn parse(s: &str) -> Result<Self, CertNumberError> {
        let trimmed = s.trim();
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(CertNumberError::NotNumeric);
        }
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&trimmed.len()) {
            return Err(CertNumberError::BadLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CertNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
