//! Shopify session token verification.
//!
//! The embedded admin app calls the merchant API with a session token in
//! `Authorization: Bearer`. It is an HS256 JWT signed with the app's API
//! secret. `aud` is the app's API key and `dest` is the shop's admin URL,
//! which is where the shop identity comes from.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use shelfwise_core::ShopDomain;

use crate::config::ShopifyAppConfig;

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
pub const LEEWAY_SECS: u64 = 5;

/// Claims the service reads from a session token.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// `https://<shop>/admin`
    pub iss: String,
    /// `https://<shop>`
    pub dest: String,
    /// Staff member id.
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    pub nbf: i64,
}

/// Why a session token was refused.
#[derive(Debug, Error)]
pub enum SessionTokenError {
    #[error("invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("session token names no valid shop: {0}")]
    BadDestination(String),

    #[error("session token issuer does not match its shop")]
    IssuerMismatch,
}

/// Verify a session token and return the shop it was issued for.
///
/// # Errors
///
/// Returns an error if the signature, algorithm, audience or validity
/// window is wrong, or if `dest` and `iss` do not name the same valid shop.
pub fn verify_session_token(
    token: &str,
    shopify: &ShopifyAppConfig,
) -> Result<ShopDomain, SessionTokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[&shopify.api_key]);
    validation.set_required_spec_claims(&["exp", "nbf", "aud", "iss"]);
    validation.validate_nbf = true;
    validation.leeway = LEEWAY_SECS;

    let key = DecodingKey::from_secret(shopify.api_secret.expose_secret().as_bytes());
    let claims = decode::<SessionClaims>(token, &key, &validation)?.claims;

    let dest_host = host_of(&claims.dest)
        .ok_or_else(|| SessionTokenError::BadDestination(claims.dest.clone()))?;
    let shop = ShopDomain::parse(&dest_host)
        .map_err(|e| SessionTokenError::BadDestination(e.to_string()))?;

    let issuer = host_of(&claims.iss).and_then(|host| ShopDomain::parse(&host).ok());
    if issuer.as_ref() != Some(&shop) {
        return Err(SessionTokenError::IssuerMismatch);
    }

    Ok(shop)
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .filter(|u| u.scheme() == "https")
        .and_then(|u| u.host_str().map(ToString::to_string))
}
