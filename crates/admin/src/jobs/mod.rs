//! Background jobs: the in-process queue, its runner and the cron scheduler.
//!
//! Jobs are plain values ([`Job`]) handed to a [`JobQueue`]; a single worker
//! task executes them through a [`JobRunner`] with bounded concurrency, a
//! per-attempt time limit and exponential backoff for retryable failures.
//! Nothing is persisted; jobs pending at shutdown are dropped and the next
//! scheduled compliance run picks up where they left off.

pub mod queue;
pub mod runner;
pub mod scheduler;

use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shelfwise_core::{CertNumber, ShopDomain};

use crate::services::{ComplianceError, ProductError, SessionError};

pub use queue::{JobQueue, JobQueueHandle};
pub use runner::{AutomationRunner, JobRunner};
pub use scheduler::build_scheduler;

/// A unit of background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    /// Run the inventory compliance sweep for one shop.
    CheckCompliance { shop: ShopDomain },
    /// Scrape one retailer product page and create the product.
    ImportRetailerProduct { shop: ShopDomain, url: String },
    /// Look up a PSA certificate and create the graded card.
    ImportPsaCert {
        shop: ShopDomain,
        cert: CertNumber,
        price: Decimal,
    },
}

impl Job {
    /// The shop the job works on.
    #[must_use]
    pub const fn shop(&self) -> &ShopDomain {
        match self {
            Self::CheckCompliance { shop }
            | Self::ImportRetailerProduct { shop, .. }
            | Self::ImportPsaCert { shop, .. } => shop,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CheckCompliance { .. } => "check_compliance",
            Self::ImportRetailerProduct { .. } => "import_retailer_product",
            Self::ImportPsaCert { .. } => "import_psa_cert",
        }
    }

    /// Imports are retried; a compliance check is not, the next scheduled
    /// run takes its place.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::CheckCompliance { .. })
    }
}

/// Errors from enqueueing or running a job.
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Product(#[from] ProductError),

    /// One attempt ran past the configured limit.
    #[error("job timed out after {0:?}")]
    Timeout(Duration),

    /// The queue buffer is full.
    #[error("job queue is full")]
    QueueFull,

    /// The worker has shut down.
    #[error("job queue is closed")]
    QueueClosed,
}

impl JobError {
    /// Failures that another attempt cannot fix.
    ///
    /// Scraper errors count as permanent here: the scraper has already
    /// retried transient failures with its own backoff.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self {
            Self::Product(
                ProductError::Validation(_)
                | ProductError::Session(SessionError::NoSession(_))
                | ProductError::Scraper(_)
                | ProductError::Incomplete { .. },
            )
            | Self::Compliance(ComplianceError::Session(SessionError::NoSession(_))) => true,
            Self::Product(ProductError::Shopify(e)) | Self::Compliance(ComplianceError::Shopify(e)) => {
                e.is_permanent()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scraper::ScraperError;
    use crate::shopify::AdminShopifyError;

    fn shop() -> ShopDomain {
        ShopDomain::parse("acme.myshopify.com").unwrap()
    }

    #[test]
    fn only_imports_are_retryable() {
        assert!(!Job::CheckCompliance { shop: shop() }.is_retryable());
        assert!(
            Job::ImportRetailerProduct {
                shop: shop(),
                url: "https://retailer.example.com/products/mug".to_string(),
            }
            .is_retryable()
        );
        assert!(
            Job::ImportPsaCert {
                shop: shop(),
                cert: CertNumber::parse("12345678").unwrap(),
                price: Decimal::from(100),
            }
            .is_retryable()
        );
    }

    #[test]
    fn job_serializes_with_type_tag() {
        let job = Job::ImportRetailerProduct {
            shop: shop(),
            url: "https://retailer.example.com/products/mug".to_string(),
        };
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["type"], "import_retailer_product");
        assert_eq!(json["shop"], "acme.myshopify.com");
        assert_eq!(job.name(), "import_retailer_product");
        assert_eq!(job.shop(), &shop());
    }

    #[test]
    fn permanent_errors() {
        assert!(JobError::Product(ProductError::Validation("title".to_string())).is_permanent());
        assert!(
            JobError::Product(ProductError::Scraper(ScraperError::NotConfigured("PSA")))
                .is_permanent()
        );
        // The scraper already spent its own retries on this.
        assert!(
            JobError::Product(ProductError::Scraper(ScraperError::RateLimited {
                url: "https://retailer.example.com".to_string(),
                retry_after_secs: 5,
            }))
            .is_permanent()
        );
        assert!(
            JobError::Product(ProductError::Shopify(AdminShopifyError::UserError(
                "title: can't be blank".to_string()
            )))
            .is_permanent()
        );
        assert!(
            JobError::Product(ProductError::Shopify(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string()
            )))
            .is_permanent()
        );
        assert!(
            JobError::Product(ProductError::Incomplete {
                product_id: "gid://shopify/Product/9".to_string(),
                source: AdminShopifyError::RateLimited(2),
            })
            .is_permanent()
        );
        assert!(
            !JobError::Product(ProductError::Shopify(AdminShopifyError::RateLimited(2)))
                .is_permanent()
        );
        assert!(!JobError::Timeout(Duration::from_secs(1)).is_permanent());
    }
}
