//! Shopify Admin API client.
//!
//! # Security
//!
//! Each [`AdminClient`] is bound to exactly one shop and carries that shop's
//! offline access token. Clients are handed out by the session resolver and
//! are never shared across shops.
//!
//! # Architecture
//!
//! - GraphQL envelopes via the `graphql_client` crate (`GraphQLQuery`
//!   implemented on hand-written operations in [`admin::queries`])
//! - REST for the two variant/inventory-item endpoints the app still uses
//! - Direct API calls to Shopify (no local catalog sync)
//!
//! # Example
//!
//! ```rust,ignore
//! use shelfwise_admin::shopify::AdminClient;
//!
//! let client = AdminClient::new(http, &shop, "2025-01", token);
//! let location = client.get_primary_location().await?;
//! let products = client.get_all_products_with_inventory(&location.id).await?;
//! ```

pub mod admin;
pub mod session_token;
pub mod types;
pub mod webhook;

pub use admin::AdminClient;
pub use types::*;

use thiserror::Error;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// REST endpoint answered with a non-success status.
    #[error("REST request failed with status {status}: {body}")]
    Rest { status: u16, body: String },

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),

    /// Pagination did not terminate.
    #[error("Pagination exceeded {0} pages")]
    PaginationLimit(usize),
}

impl AdminShopifyError {
    /// Errors that repeating the same request cannot fix: rejected input
    /// and a revoked or invalid token.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::UserError(_) | Self::Unauthorized(_))
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}
