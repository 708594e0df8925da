//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Database ping
//!
//! # Wishlist (customer extension, CORS)
//! POST /api/wishlist                    - Wishlist intents
//! GET  /api/wishlist/suggested          - Suggested keywords
//!
//! # Merchant app
//! GET  /api/notifications               - Unshown notifications
//! POST /api/notifications/clear         - Mark notifications shown
//! POST /api/products                    - Create a product
//! POST /api/products/import             - Queue a retailer import
//! POST /api/products/import-collection  - Queue imports for a collection
//! POST /api/products/psa                - Queue a PSA certificate import
//! GET  /api/suggested-keywords          - List (POST adds, DELETE removes)
//! GET  /api/diagnostics/webhooks        - Webhook subscriptions
//! POST /api/diagnostics/inventory-check - Run compliance now
//!
//! # Shopify
//! POST /webhooks/inventory              - Inventory webhook (HMAC verified)
//! ```
//!
//! Wishlist routes identify the shop with [`RequireShop`]; merchant routes
//! require a verified session token through [`RequireMerchant`].
//!
//! [`RequireShop`]: crate::middleware::RequireShop
//! [`RequireMerchant`]: crate::middleware::RequireMerchant

pub mod diagnostics;
pub mod keywords;
pub mod notifications;
pub mod products;
pub mod webhooks;
pub mod wishlist;

use axum::{Router, extract::State, http::StatusCode, routing::get};

use crate::middleware::extension_cors;
use crate::state::AppState;

/// Build the application router (without state).
pub fn routes(extension_origin: Option<&str>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(wishlist::router().layer(extension_cors(extension_origin)))
        .merge(notifications::router())
        .merge(products::router())
        .merge(keywords::router())
        .merge(diagnostics::router())
        .merge(webhooks::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
