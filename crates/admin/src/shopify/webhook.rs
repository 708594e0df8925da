//! Shopify webhook signature verification.
//!
//! Shopify signs each webhook body with the app's API secret and sends the
//! base64 HMAC-SHA256 digest in `X-Shopify-Hmac-Sha256`.

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";

/// Header carrying the originating shop domain.
pub const SHOP_DOMAIN_HEADER: &str = "x-shopify-shop-domain";

/// Header carrying the webhook topic (e.g. `inventory_levels/update`).
pub const TOPIC_HEADER: &str = "x-shopify-topic";

/// Verify a webhook body against its base64 signature.
///
/// Comparison is constant-time.
#[must_use]
pub fn verify_webhook_hmac(body: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(provided) = STANDARD.decode(signature.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&provided).is_ok()
}
