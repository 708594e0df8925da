//! Shop identity extractor.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use shelfwise_core::ShopDomain;

/// Header carrying the calling shop's `*.myshopify.com` domain.
pub const SHOP_HEADER: &str = "x-shop-domain";

/// Extractor that requires a valid shop domain.
///
/// Read from the `X-Shop-Domain` header, falling back to the `shop` query
/// parameter.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireShop(shop): RequireShop) -> impl IntoResponse {
///     format!("Hello, {shop}!")
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireShop(pub ShopDomain);

/// Error returned when the shop is missing or malformed.
#[derive(Debug)]
pub enum ShopRejection {
    Missing,
    Invalid(String),
}

impl IntoResponse for ShopRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::Missing => "missing shop domain".to_string(),
            Self::Invalid(reason) => format!("invalid shop domain: {reason}"),
        };
        (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
    }
}

impl<S> FromRequestParts<S> for RequireShop
where
    S: Send + Sync,
{
    type Rejection = ShopRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(SHOP_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
            .or_else(|| shop_from_query(parts.uri.query()?))
            .ok_or(ShopRejection::Missing)?;

        ShopDomain::parse(&raw)
            .map(Self)
            .map_err(|e| ShopRejection::Invalid(e.to_string()))
    }
}

fn shop_from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "shop")
        .map(|(_, value)| value.into_owned())
}
