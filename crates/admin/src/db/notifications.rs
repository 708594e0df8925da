//! Database operations for merchant notifications.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shelfwise_core::{NotificationId, NotificationKind, ShopDomain};

use super::RepositoryError;
use crate::models::Notification;

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: NotificationId,
    title: String,
    kind: NotificationKind,
    shown: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            kind: row.kind,
            shown: row.shown,
            created_at: row.created_at,
        }
    }
}

/// Repository for notification database operations.
pub struct NotificationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NotificationRepository<'a> {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a notification for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        shop: &ShopDomain,
        title: &str,
        kind: NotificationKind,
    ) -> Result<Notification, RepositoryError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            r"
            INSERT INTO notifications (shop, title, kind)
            VALUES ($1, $2, $3)
            RETURNING id, title, kind, shown, created_at
            ",
        )
        .bind(shop)
        .bind(title)
        .bind(kind)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Notifications the merchant has not dismissed yet, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_unshown(
        &self,
        shop: &ShopDomain,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, title, kind, shown, created_at
            FROM notifications
            WHERE shop = $1 AND NOT shown
            ORDER BY created_at, id
            ",
        )
        .bind(shop)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Mark notifications as shown; an empty `ids` marks every unshown one.
    ///
    /// Returns the number of rows updated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_shown(
        &self,
        shop: &ShopDomain,
        ids: &[NotificationId],
    ) -> Result<u64, RepositoryError> {
        let result = if ids.is_empty() {
            sqlx::query("UPDATE notifications SET shown = TRUE WHERE shop = $1 AND NOT shown")
                .bind(shop)
                .execute(self.pool)
                .await?
        } else {
            let raw: Vec<i64> = ids.iter().map(NotificationId::as_i64).collect();
            sqlx::query(
                r"
                UPDATE notifications
                SET shown = TRUE
                WHERE shop = $1 AND id = ANY($2) AND NOT shown
                ",
            )
            .bind(shop)
            .bind(raw)
            .execute(self.pool)
            .await?
        };

        Ok(result.rows_affected())
    }

    /// Delete shown notifications created before `older_than`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn prune_shown(&self, older_than: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM notifications WHERE shown AND created_at < $1")
            .bind(older_than)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
