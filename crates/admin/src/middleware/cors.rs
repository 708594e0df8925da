//! CORS for the customer-facing wishlist extension.

use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::shop::SHOP_HEADER;

/// CORS layer admitting only `origin`.
///
/// The origin is matched against the request's `Origin` header; any other
/// origin gets no `Access-Control-Allow-Origin`. With no origin configured
/// (or an unparsable one) no cross-origin request is allowed.
#[must_use]
pub fn extension_cors(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(SHOP_HEADER)]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(AllowOrigin::list([origin])),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "EXTENSION_ORIGIN is not a valid header value, CORS disabled");
            layer
        }
        None => layer,
    }
}
