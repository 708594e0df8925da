//! Database operations for installed-shop sessions.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;

use shelfwise_core::ShopDomain;

use super::RepositoryError;
use crate::models::ShopSession;

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    shop: String,
    access_token: String,
    scope: String,
    expires_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for ShopSession {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let shop = ShopDomain::parse(&row.shop).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid shop '{}': {e}", row.shop))
        })?;

        Ok(Self {
            shop,
            access_token: SecretString::from(row.access_token),
            scope: row.scope,
            expires_at: row.expires_at,
        })
    }
}

/// Repository for shop session storage.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<ShopSession>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r"
            SELECT shop, access_token, scope, expires_at
            FROM shop_sessions
            WHERE shop = $1
            ",
        )
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List every shop holding an unexpired token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_shops(&self) -> Result<Vec<ShopDomain>, RepositoryError> {
        let shops: Vec<String> = sqlx::query_scalar(
            r"
            SELECT shop
            FROM shop_sessions
            WHERE expires_at IS NULL OR expires_at > now()
            ORDER BY shop
            ",
        )
        .fetch_all(self.pool)
        .await?;

        shops
            .into_iter()
            .map(|s| {
                ShopDomain::parse(&s).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid shop '{s}': {e}"))
                })
            })
            .collect()
    }

    /// Insert or replace the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn save(&self, session: &ShopSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO shop_sessions (shop, access_token, scope, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (shop) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                scope = EXCLUDED.scope,
                expires_at = EXCLUDED.expires_at,
                updated_at = now()
            ",
        )
        .bind(&session.shop)
        .bind(session.access_token.expose_secret())
        .bind(&session.scope)
        .bind(session.expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Delete a shop's session (app uninstalled).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop has no session.
    pub async fn delete(&self, shop: &ShopDomain) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop_sessions WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
