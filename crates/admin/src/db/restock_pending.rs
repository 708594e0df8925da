//! Database operations for restock emails still owed to subscribers.

use sqlx::PgPool;

use shelfwise_core::ShopDomain;

use super::RepositoryError;

/// Repository for pending restock emails.
pub struct RestockPendingRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> RestockPendingRepository<'a> {
    /// Create a new pending-restock repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Mark a product as owed a restock email. Marking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn mark(&self, shop: &ShopDomain, product_id: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO restock_pending (shop, product_id)
            VALUES ($1, $2)
            ON CONFLICT (shop, product_id) DO NOTHING
            ",
        )
        .bind(shop)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Product ids owed a restock email, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, shop: &ShopDomain) -> Result<Vec<String>, RepositoryError> {
        let ids = sqlx::query_scalar(
            "SELECT product_id FROM restock_pending WHERE shop = $1 ORDER BY created_at, product_id",
        )
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        Ok(ids)
    }

    /// Clear a product's marker once its email is handled.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, shop: &ShopDomain, product_id: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM restock_pending WHERE shop = $1 AND product_id = $2")
            .bind(shop)
            .bind(product_id)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
