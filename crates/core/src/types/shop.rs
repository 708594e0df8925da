//! Shopify shop domain.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    #[error("shop domain cannot be empty")]
    Empty,
    #[error("shop domain must end with .myshopify.com")]
    NotMyshopify,
    #[error("shop handle may only contain letters, digits and hyphens")]
    InvalidHandle,
}

/// A `<handle>.myshopify.com` domain identifying one merchant.
///
/// Every session, wishlist, notification and job is keyed by this value.
/// A leading `https://` and trailing `/` are tolerated and stripped.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ShopDomain(String);

impl ShopDomain {
    const SUFFIX: &'static str = ".myshopify.com";

    /// Parse a shop domain.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is empty, is not a `myshopify.com`
    /// host, or the handle contains characters Shopify does not allow.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let lowered = s.trim().to_lowercase();
        let host = lowered
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');

        if host.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        let handle = host
            .strip_suffix(Self::SUFFIX)
            .ok_or(ShopDomainError::NotMyshopify)?;

        if handle.is_empty()
            || handle.starts_with('-')
            || !handle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(ShopDomainError::InvalidHandle);
        }

        Ok(Self(host.to_owned()))
    }

    /// Full domain, e.g. `cards-r-us.myshopify.com`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ShopDomain {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl_pg_text!(ShopDomain);
