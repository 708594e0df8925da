//! Database operations for wishlists, keywords and suggested keywords.

use sqlx::PgPool;

use shelfwise_core::{Email, Keyword, ShopDomain, SuggestedKeywordId, WishlistId};

use super::RepositoryError;
use crate::models::{SuggestedKeyword, Wishlist};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct WishlistRow {
    id: WishlistId,
    customer_id: String,
    email: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct SuggestedKeywordRow {
    id: SuggestedKeywordId,
    value: String,
}

impl TryFrom<SuggestedKeywordRow> for SuggestedKeyword {
    type Error = RepositoryError;

    fn try_from(row: SuggestedKeywordRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            value: parse_stored_keyword(&row.value)?,
        })
    }
}

fn parse_stored_keyword(value: &str) -> Result<Keyword, RepositoryError> {
    Keyword::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid keyword '{value}': {e}")))
}

fn parse_stored_email(value: &str) -> Result<Email, RepositoryError> {
    Email::parse(value)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid email '{value}': {e}")))
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for wishlist database operations.
///
/// Every wishlist lookup is scoped by shop so one shop can never read or
/// modify another shop's customers.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a customer's wishlist, creating an empty one on first use.
    ///
    /// Repeated calls for the same customer return the same row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(
        &self,
        shop: &ShopDomain,
        customer_id: &str,
    ) -> Result<Wishlist, RepositoryError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query_as::<_, WishlistRow>(
            r"
            INSERT INTO wishlists (shop, customer_id)
            VALUES ($1, $2)
            ON CONFLICT (shop, customer_id) DO UPDATE
            SET customer_id = EXCLUDED.customer_id
            RETURNING id, customer_id, email
            ",
        )
        .bind(shop)
        .bind(customer_id)
        .fetch_one(self.pool)
        .await?;

        self.hydrate(shop, row).await
    }

    /// Add a keyword. Adding a keyword the wishlist already has is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_keyword(
        &self,
        wishlist_id: WishlistId,
        keyword: &Keyword,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO keywords (wishlist_id, value)
            VALUES ($1, $2)
            ON CONFLICT (wishlist_id, value) DO NOTHING
            ",
        )
        .bind(wishlist_id)
        .bind(keyword)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Remove a keyword. Removing a keyword that is not present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_keyword(
        &self,
        wishlist_id: WishlistId,
        keyword: &Keyword,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM keywords WHERE wishlist_id = $1 AND value = $2")
            .bind(wishlist_id)
            .bind(keyword)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Set or clear the restock notification email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the wishlist does not exist.
    pub async fn set_email(
        &self,
        wishlist_id: WishlistId,
        email: Option<&Email>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE wishlists
            SET email = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(wishlist_id)
        .bind(email)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// List a wishlist's keywords ordered by value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_keywords(
        &self,
        wishlist_id: WishlistId,
    ) -> Result<Vec<Keyword>, RepositoryError> {
        let values: Vec<String> = sqlx::query_scalar(
            r"
            SELECT value
            FROM keywords
            WHERE wishlist_id = $1
            ORDER BY value
            ",
        )
        .bind(wishlist_id)
        .fetch_all(self.pool)
        .await?;

        values.iter().map(|v| parse_stored_keyword(v)).collect()
    }

    /// Emails of the shop's customers with a keyword contained in `title`.
    ///
    /// Keywords are stored lowercased, so matching lowercases the title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subscribers_for_title(
        &self,
        shop: &ShopDomain,
        title: &str,
    ) -> Result<Vec<Email>, RepositoryError> {
        let emails: Vec<String> = sqlx::query_scalar(
            r"
            SELECT DISTINCT w.email
            FROM wishlists w
            JOIN keywords k ON k.wishlist_id = w.id
            WHERE w.shop = $1
              AND w.email IS NOT NULL
              AND strpos(lower($2), k.value) > 0
            ORDER BY w.email
            ",
        )
        .bind(shop)
        .bind(title)
        .fetch_all(self.pool)
        .await?;

        emails.iter().map(|e| parse_stored_email(e)).collect()
    }

    // =========================================================================
    // Suggested keywords
    // =========================================================================

    /// The shop's suggested keywords ordered by value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn suggested_keywords(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<SuggestedKeyword>, RepositoryError> {
        let rows = sqlx::query_as::<_, SuggestedKeywordRow>(
            r"
            SELECT id, value
            FROM suggested_keywords
            WHERE shop = $1
            ORDER BY value
            ",
        )
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Add a suggested keyword, returning the existing row on duplicates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add_suggested_keyword(
        &self,
        shop: &ShopDomain,
        keyword: &Keyword,
    ) -> Result<SuggestedKeyword, RepositoryError> {
        let row = sqlx::query_as::<_, SuggestedKeywordRow>(
            r"
            INSERT INTO suggested_keywords (shop, value)
            VALUES ($1, $2)
            ON CONFLICT (shop, value) DO UPDATE
            SET value = EXCLUDED.value
            RETURNING id, value
            ",
        )
        .bind(shop)
        .bind(keyword)
        .fetch_one(self.pool)
        .await?;

        row.try_into()
    }

    /// Remove a suggested keyword.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the shop has no such keyword.
    pub async fn remove_suggested_keyword(
        &self,
        shop: &ShopDomain,
        keyword: &Keyword,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM suggested_keywords WHERE shop = $1 AND value = $2")
            .bind(shop)
            .bind(keyword)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn hydrate(
        &self,
        shop: &ShopDomain,
        row: WishlistRow,
    ) -> Result<Wishlist, RepositoryError> {
        let keywords = self.list_keywords(row.id).await?;
        let email = row.email.as_deref().map(parse_stored_email).transpose()?;

        Ok(Wishlist {
            id: row.id,
            shop: shop.clone(),
            customer_id: row.customer_id,
            email,
            keywords,
        })
    }
}
