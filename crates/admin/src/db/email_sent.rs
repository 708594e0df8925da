//! Database operations for the restock email dedupe log.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shelfwise_core::ShopDomain;

use super::RepositoryError;

/// A won claim on a product's restock email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct SendClaim {
    /// The send time the claim replaced, if any.
    pub previous: Option<DateTime<Utc>>,
}

/// Repository for restock email send times.
pub struct EmailSentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EmailSentRepository<'a> {
    /// Create a new email log repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// When a restock email was last sent for a product, if ever.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn last_sent(
        &self,
        shop: &ShopDomain,
        product_id: &str,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let sent_at = sqlx::query_scalar(
            "SELECT sent_at FROM email_sent WHERE shop = $1 AND product_id = $2",
        )
        .bind(shop)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(sent_at)
    }

    /// Claim the right to send a restock email for a product.
    ///
    /// The claim succeeds when no email was ever sent or the last one is no
    /// newer than `cutoff`; the row then holds `now`. Concurrent claims on
    /// the same product serialise on the row, so only one of them wins.
    /// Returns `None` when the product is still inside its cooldown.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn claim(
        &self,
        shop: &ShopDomain,
        product_id: &str,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<SendClaim>, RepositoryError> {
        let previous: Option<Option<DateTime<Utc>>> = sqlx::query_scalar(
            r"
            WITH prev AS (
                SELECT sent_at FROM email_sent WHERE shop = $1 AND product_id = $2
            )
            INSERT INTO email_sent (shop, product_id, sent_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop, product_id) DO UPDATE
            SET sent_at = EXCLUDED.sent_at
            WHERE email_sent.sent_at <= $4
            RETURNING (SELECT sent_at FROM prev)
            ",
        )
        .bind(shop)
        .bind(product_id)
        .bind(now)
        .bind(cutoff)
        .fetch_optional(self.pool)
        .await?;

        Ok(previous.map(|previous| SendClaim { previous }))
    }

    /// Give a claim back after the send failed, restoring the previous
    /// send time so the next run may try again.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn release(
        &self,
        shop: &ShopDomain,
        product_id: &str,
        claim: SendClaim,
    ) -> Result<(), RepositoryError> {
        match claim.previous {
            Some(at) => self.record(shop, product_id, at).await,
            None => {
                sqlx::query("DELETE FROM email_sent WHERE shop = $1 AND product_id = $2")
                    .bind(shop)
                    .bind(product_id)
                    .execute(self.pool)
                    .await?;
                Ok(())
            }
        }
    }

    /// Record a send, replacing the previous timestamp.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn record(
        &self,
        shop: &ShopDomain,
        product_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO email_sent (shop, product_id, sent_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (shop, product_id) DO UPDATE
            SET sent_at = EXCLUDED.sent_at
            ",
        )
        .bind(shop)
        .bind(product_id)
        .bind(at)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
