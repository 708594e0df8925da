//! Resolves a shop domain to an Admin API client.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use sqlx::PgPool;
use thiserror::Error;

use shelfwise_core::ShopDomain;

use crate::config::ShopifyAppConfig;
use crate::db::{RepositoryError, SessionRepository};
use crate::shopify::AdminClient;

/// Errors resolving a shop session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The shop has not installed the app, or its token expired.
    #[error("no active session for {0}")]
    NoSession(ShopDomain),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Hands out shop-bound [`AdminClient`]s built from stored sessions.
///
/// Clients are cached for 5 minutes so a compliance sweep or a burst of
/// requests does not hit the sessions table per call.
#[derive(Clone)]
pub struct SessionResolver {
    inner: Arc<SessionResolverInner>,
}

struct SessionResolverInner {
    pool: PgPool,
    http: reqwest::Client,
    api_version: String,
    /// Overrides `https://<shop>` when set.
    base_url: Option<String>,
    cache: Cache<ShopDomain, AdminClient>,
}

impl SessionResolver {
    /// Create a resolver that talks to each shop's own Admin API host, or
    /// to `admin_base_url` when the config sets one.
    #[must_use]
    pub fn new(pool: PgPool, http: reqwest::Client, shopify: &ShopifyAppConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(SessionResolverInner {
                pool,
                http,
                api_version: shopify.api_version.clone(),
                base_url: shopify.admin_base_url.clone(),
                cache,
            }),
        }
    }

    /// Get an Admin API client for `shop`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` if the shop has no unexpired
    /// session, or a repository error if the lookup fails.
    pub async fn resolve(&self, shop: &ShopDomain) -> Result<AdminClient, SessionError> {
        if let Some(client) = self.inner.cache.get(shop).await {
            return Ok(client);
        }

        let session = SessionRepository::new(&self.inner.pool)
            .get_by_shop(shop)
            .await?
            .filter(|s| s.is_active(Utc::now()))
            .ok_or_else(|| SessionError::NoSession(shop.clone()))?;

        let client = match &self.inner.base_url {
            Some(base_url) => AdminClient::with_base_url(
                self.inner.http.clone(),
                &session.shop,
                base_url,
                &self.inner.api_version,
                session.access_token,
            ),
            None => AdminClient::new(
                self.inner.http.clone(),
                &session.shop,
                &self.inner.api_version,
                session.access_token,
            ),
        };

        self.inner.cache.insert(shop.clone(), client.clone()).await;
        Ok(client)
    }

    /// Drop a cached client (token revoked or rotated).
    pub async fn invalidate(&self, shop: &ShopDomain) {
        self.inner.cache.invalidate(shop).await;
    }

    /// The shared database pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }
}
