//! Inventory compliance: keep product status in line with stock.
//!
//! An Active product with no stock moves to Draft; a Draft product that is
//! back in stock moves to Active unless it carries a bypass tag. Archived
//! products are never touched. The decision depends only on the current
//! status and inventory, so a product sitting at zero flips exactly once.
//!
//! A reactivation leaves a pending-restock marker that is written before
//! the flip and cleared only once the restock email is handled. A send that
//! fails is retried on the next run even though the product no longer
//! needs a flip.

use std::collections::HashSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use shelfwise_core::{NotificationKind, ProductStatus, ShopDomain};

use super::email::{EmailError, EmailService, RestockProduct};
use super::sessions::{SessionError, SessionResolver};
use crate::config::AutomationConfig;
use crate::db::{
    EmailSentRepository, NotificationRepository, RepositoryError, RestockPendingRepository,
    WishlistRepository,
};
use crate::shopify::{AdminClient, AdminShopifyError, CatalogProduct};

/// Errors from a compliance run or a single product within it.
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Email error: {0}")]
    Email(#[from] EmailError),
}

/// Why a product's status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipReason {
    OutOfStock,
    Restocked,
}

/// The evaluator's verdict for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NoChange,
    Flip { to: ProductStatus, reason: FlipReason },
}

/// Decide whether `product`'s status should change.
#[must_use]
pub fn evaluate(product: &CatalogProduct, bypass_tags: &[String]) -> Decision {
    let total = product.total_inventory();

    match product.status {
        ProductStatus::Active if total == 0 => Decision::Flip {
            to: ProductStatus::Draft,
            reason: FlipReason::OutOfStock,
        },
        ProductStatus::Draft if total > 0 && !bypass_tags.iter().any(|t| product.has_tag(t)) => {
            Decision::Flip {
                to: ProductStatus::Active,
                reason: FlipReason::Restocked,
            }
        }
        _ => Decision::NoChange,
    }
}

/// Whether a restock email may go out: never sent, or the last send is at
/// least `cooldown` old.
#[must_use]
pub fn restock_email_due(
    last_sent: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown: TimeDelta,
) -> bool {
    last_sent.is_none_or(|at| now - at >= cooldown)
}

/// Outcome counts of one compliance run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub checked: usize,
    pub drafted: usize,
    pub activated: usize,
    pub emails_sent: usize,
    pub failures: usize,
}

impl ComplianceReport {
    /// Whether the run changed or failed anything worth telling the merchant.
    #[must_use]
    pub const fn is_noteworthy(&self) -> bool {
        self.drafted + self.activated + self.failures > 0
    }

    /// One-line summary for the merchant's notification feed.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.drafted > 0 {
            parts.push(format!("{} moved to Draft", self.drafted));
        }
        if self.activated > 0 {
            parts.push(format!("{} reactivated", self.activated));
        }
        if self.emails_sent > 0 {
            parts.push(format!("{} restock emails sent", self.emails_sent));
        }
        if self.failures > 0 {
            parts.push(format!("{} failed", self.failures));
        }
        if parts.is_empty() {
            return format!("Inventory check: {} products in line", self.checked);
        }
        format!("Inventory check: {}", parts.join(", "))
    }
}

/// Notification title for a status flip.
#[must_use]
pub fn flip_title(title: &str, reason: FlipReason) -> String {
    match reason {
        FlipReason::OutOfStock => format!("{title} moved to Draft (out of stock)"),
        FlipReason::Restocked => format!("{title} is back in stock"),
    }
}

/// Runs the compliance sweep for one shop.
#[derive(Clone)]
pub struct ComplianceService {
    sessions: SessionResolver,
    email: EmailService,
    config: AutomationConfig,
}

impl ComplianceService {
    #[must_use]
    pub const fn new(sessions: SessionResolver, email: EmailService, config: AutomationConfig) -> Self {
        Self {
            sessions,
            email,
            config,
        }
    }

    /// Evaluate every product of `shop` and apply status flips.
    ///
    /// A failure on one product is logged and counted; the sweep continues.
    ///
    /// # Errors
    ///
    /// Returns an error only when the sweep cannot start: no session, no
    /// location, or the catalog cannot be read.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn check_shop(&self, shop: &ShopDomain) -> Result<ComplianceReport, ComplianceError> {
        let client = self.sessions.resolve(shop).await?;
        let products = match read_catalog(&client).await {
            Ok(products) => products,
            Err(e) => {
                if matches!(e, AdminShopifyError::Unauthorized(_)) {
                    tracing::warn!("Access token rejected, dropping cached session");
                    self.sessions.invalidate(shop).await;
                }
                return Err(e.into());
            }
        };

        let mut report = ComplianceReport {
            checked: products.len(),
            ..ComplianceReport::default()
        };

        let mut activated = HashSet::new();
        for product in &products {
            match self.apply(shop, &client, product, &mut report).await {
                Ok(Some(FlipReason::Restocked)) => {
                    activated.insert(product.id.as_str());
                }
                Ok(_) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!(
                        product_id = %product.id,
                        title = %product.title,
                        error = %e,
                        "Compliance update failed for product"
                    );
                }
            }
        }

        self.send_pending_restock_emails(shop, &products, &activated, &mut report)
            .await;

        if report.is_noteworthy() {
            let kind = if report.failures > 0 {
                NotificationKind::Warning
            } else {
                NotificationKind::Info
            };
            if let Err(e) = NotificationRepository::new(self.sessions.pool())
                .create(shop, &report.summary(), kind)
                .await
            {
                tracing::error!(error = %e, "Failed to record compliance summary");
            }
        }

        tracing::info!(
            checked = report.checked,
            drafted = report.drafted,
            activated = report.activated,
            emails_sent = report.emails_sent,
            failures = report.failures,
            "Compliance check complete"
        );
        Ok(report)
    }

    /// Apply the evaluator's verdict to one product, returning the reason
    /// when its status changed.
    async fn apply(
        &self,
        shop: &ShopDomain,
        client: &AdminClient,
        product: &CatalogProduct,
        report: &mut ComplianceReport,
    ) -> Result<Option<FlipReason>, ComplianceError> {
        let Decision::Flip { to, reason } = evaluate(product, &self.config.bypass_tags) else {
            return Ok(None);
        };

        if reason == FlipReason::Restocked {
            RestockPendingRepository::new(self.sessions.pool())
                .mark(shop, &product.id)
                .await?;
        }

        client.update_product_status(&product.id, to).await?;
        match reason {
            FlipReason::OutOfStock => report.drafted += 1,
            FlipReason::Restocked => report.activated += 1,
        }
        tracing::info!(product_id = %product.id, status = %to, "Product status changed");

        let kind = match reason {
            FlipReason::OutOfStock => NotificationKind::Warning,
            FlipReason::Restocked => NotificationKind::Success,
        };
        if let Err(e) = NotificationRepository::new(self.sessions.pool())
            .create(shop, &flip_title(&product.title, reason), kind)
            .await
        {
            tracing::error!(product_id = %product.id, error = %e, "Failed to record status change");
        }

        Ok(Some(reason))
    }

    /// Send the restock emails still owed for this shop.
    ///
    /// Only products live after this run are emailed; a marker on a product
    /// that went back to Draft waits for its next restock. Markers for
    /// products gone from the catalog are dropped.
    async fn send_pending_restock_emails(
        &self,
        shop: &ShopDomain,
        products: &[CatalogProduct],
        activated: &HashSet<&str>,
        report: &mut ComplianceReport,
    ) {
        let pending = RestockPendingRepository::new(self.sessions.pool());
        let ids = match pending.list(shop).await {
            Ok(ids) => ids,
            Err(e) => {
                report.failures += 1;
                tracing::error!(error = %e, "Failed to read pending restock emails");
                return;
            }
        };

        for id in ids {
            let product = products.iter().find(|p| p.id == id);
            let live = product.is_some_and(|p| {
                activated.contains(p.id.as_str())
                    || (p.status == ProductStatus::Active && p.total_inventory() > 0)
            });

            let handled = match product {
                None => true,
                Some(_) if !live => continue,
                Some(product) => match self.send_restock_email(shop, product).await {
                    Ok(sent) => {
                        report.emails_sent += sent;
                        true
                    }
                    Err(e) => {
                        report.failures += 1;
                        tracing::warn!(
                            product_id = %product.id,
                            error = %e,
                            "Restock email failed, retrying next run"
                        );
                        false
                    }
                },
            };

            if !handled {
                continue;
            }
            if let Err(e) = pending.clear(shop, &id).await {
                tracing::error!(product_id = %id, error = %e, "Failed to clear pending restock email");
            }
        }
    }

    /// Email wishlist subscribers about a restock, at most once per
    /// cooldown window per product. Returns the number of recipients.
    ///
    /// The send is claimed atomically first, so overlapping runs for the
    /// same shop cannot both email. A failed send gives the claim back.
    async fn send_restock_email(
        &self,
        shop: &ShopDomain,
        product: &CatalogProduct,
    ) -> Result<usize, ComplianceError> {
        let pool = self.sessions.pool();
        let log = EmailSentRepository::new(pool);
        let now = Utc::now();

        let cooldown = TimeDelta::from_std(self.config.restock_email_cooldown)
            .unwrap_or(TimeDelta::MAX);
        if !restock_email_due(log.last_sent(shop, &product.id).await?, now, cooldown) {
            tracing::debug!(product_id = %product.id, "Restock email inside cooldown");
            return Ok(0);
        }

        let recipients = WishlistRepository::new(pool)
            .subscribers_for_title(shop, &product.title)
            .await?;
        if recipients.is_empty() {
            return Ok(0);
        }

        let cutoff = now
            .checked_sub_signed(cooldown)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let Some(claim) = log.claim(shop, &product.id, now, cutoff).await? else {
            tracing::debug!(product_id = %product.id, "Restock email already claimed");
            return Ok(0);
        };

        let result = self
            .email
            .send_restock_batch(
                &recipients,
                &RestockProduct {
                    title: &product.title,
                    url: product.online_store_url.as_deref(),
                },
            )
            .await;

        match result {
            Ok(sent) => Ok(sent),
            Err(e) => {
                if let Err(release) = log.release(shop, &product.id, claim).await {
                    tracing::error!(product_id = %product.id, error = %release, "Failed to release restock email claim");
                }
                Err(e.into())
            }
        }
    }
}

async fn read_catalog(client: &AdminClient) -> Result<Vec<CatalogProduct>, AdminShopifyError> {
    let location = client.get_primary_location().await?;
    client.get_all_products_with_inventory(&location.id).await
}
