//! Database operations for the service `PostgreSQL`.
//!
//! ## Tables
//!
//! - `shop_sessions` - Offline access tokens per installed shop
//! - `wishlists` - One row per (shop, customer)
//! - `keywords` - Wishlist keywords, unique per wishlist
//! - `suggested_keywords` - Merchant-curated keywords, unique per shop
//! - `notifications` - In-app merchant notifications
//! - `email_sent` - Last restock email per (shop, product)
//! - `restock_pending` - Reactivated products still owed a restock email
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p shelfwise-cli -- migrate
//! ```

pub mod email_sent;
pub mod notifications;
pub mod restock_pending;
pub mod sessions;
pub mod wishlists;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use email_sent::{EmailSentRepository, SendClaim};
pub use notifications::NotificationRepository;
pub use restock_pending::RestockPendingRepository;
pub use sessions::SessionRepository;
pub use wishlists::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate keyword).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
