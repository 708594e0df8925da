//! Installed-shop sessions.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use shelfwise_core::ShopDomain;

/// An offline access credential for one installed shop.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct ShopSession {
    pub shop: ShopDomain,
    pub access_token: SecretString,
    /// Comma-separated OAuth scopes granted at install.
    pub scope: String,
    /// `None` for offline tokens, which do not expire.
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShopSession {
    /// Whether the token is still usable at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("shop", &self.shop)
            .field("access_token", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn session(expires_at: Option<DateTime<Utc>>) -> ShopSession {
        ShopSession {
            shop: ShopDomain::parse("demo.myshopify.com").unwrap(),
            access_token: SecretString::from("shpat_0123456789"),
            scope: "write_products".to_string(),
            expires_at,
        }
    }

    #[test]
    fn test_offline_token_never_expires() {
        assert!(session(None).is_active(Utc::now()));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        assert!(!session(Some(now - Duration::minutes(1))).is_active(now));
        assert!(session(Some(now + Duration::minutes(1))).is_active(now));
    }

    #[test]
    fn test_debug_redacts_token() {
        let output = format!("{:?}", session(None));
        assert!(output.contains("demo.myshopify.com"));
        assert!(!output.contains("shpat_0123456789"));
    }
}
