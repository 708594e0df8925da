//! Merchant identity extractor for the embedded admin app's routes.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use shelfwise_core::ShopDomain;

use crate::shopify::session_token::verify_session_token;
use crate::state::AppState;

/// Extractor that requires a valid Shopify session token.
///
/// The shop comes from the verified token, never from a header the caller
/// controls, so a merchant can only act on their own shop.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireMerchant(shop): RequireMerchant) -> impl IntoResponse {
///     format!("Hello, {shop}!")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireMerchant(pub ShopDomain);

/// Error returned when the session token is missing or does not verify.
#[derive(Debug)]
pub enum MerchantRejection {
    Missing,
    Invalid(String),
}

impl IntoResponse for MerchantRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::Missing => "missing session token".to_string(),
            Self::Invalid(reason) => reason,
        };
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}

impl FromRequestParts<AppState> for RequireMerchant {
    type Rejection = MerchantRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(MerchantRejection::Missing)?;

        verify_session_token(token, &state.config().shopify)
            .map(Self)
            .map_err(|e| {
                tracing::debug!(error = %e, "Session token refused");
                MerchantRejection::Invalid(e.to_string())
            })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
