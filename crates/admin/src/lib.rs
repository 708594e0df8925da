//! Shelfwise service library.
//!
//! Back end of a Shopify merchant app: product creation and imports,
//! inventory compliance automation, the customer wishlist API, merchant
//! notifications and restock emails.
//!
//! # Security
//!
//! The service holds offline Admin API tokens for every installed shop.
//! Tokens are only ever handed out bound to the shop they belong to (see
//! [`services::SessionResolver`]). Merchant routes take the shop from a
//! session token signed with the app secret, and webhooks are HMAC-verified
//! with the same secret before they are acted on.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod scraper;
pub mod services;
pub mod shopify;
pub mod state;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use state::AppState;

/// Build the full application router with request tracing.
pub fn app(state: AppState) -> Router {
    let extension_origin = state.config().extension_origin.clone();

    routes::routes(extension_origin.as_deref())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record("latency_ms", latency.as_millis() as u64);
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}
