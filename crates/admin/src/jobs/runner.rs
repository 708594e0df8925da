//! Executes jobs against the service layer.

use async_trait::async_trait;

use shelfwise_core::NotificationKind;

use super::{Job, JobError};
use crate::db::NotificationRepository;
use crate::services::{ComplianceService, CreateOutcome, ProductCreator};

/// Something that can execute a [`Job`].
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    /// Run one attempt of `job`.
    async fn run(&self, job: &Job) -> Result<(), JobError>;

    /// Called once when a job fails for good (no retries left).
    async fn on_failure(&self, _job: &Job, _error: &JobError) {}
}

/// Production runner backed by the compliance and product services.
#[derive(Clone)]
pub struct AutomationRunner {
    compliance: ComplianceService,
    products: ProductCreator,
    pool: sqlx::PgPool,
}

impl AutomationRunner {
    #[must_use]
    pub const fn new(
        compliance: ComplianceService,
        products: ProductCreator,
        pool: sqlx::PgPool,
    ) -> Self {
        Self {
            compliance,
            products,
            pool,
        }
    }
}

/// Merchant-facing description of a job that gave up.
#[must_use]
pub fn failure_title(job: &Job, error: &JobError) -> String {
    match job {
        Job::CheckCompliance { .. } => format!("Inventory check failed: {error}"),
        Job::ImportRetailerProduct { url, .. } => format!("Import of {url} failed: {error}"),
        Job::ImportPsaCert { cert, .. } => format!("PSA import of cert {cert} failed: {error}"),
    }
}

#[async_trait]
impl JobRunner for AutomationRunner {
    async fn run(&self, job: &Job) -> Result<(), JobError> {
        match job {
            Job::CheckCompliance { shop } => {
                self.compliance.check_shop(shop).await?;
            }
            Job::ImportRetailerProduct { shop, url } => {
                log_outcome(&self.products.import_from_retailer(shop, url).await?);
            }
            Job::ImportPsaCert { shop, cert, price } => {
                log_outcome(&self.products.import_psa_cert(shop, cert, *price).await?);
            }
        }
        Ok(())
    }

    async fn on_failure(&self, job: &Job, error: &JobError) {
        if let Err(e) = NotificationRepository::new(&self.pool)
            .create(job.shop(), &failure_title(job, error), NotificationKind::Error)
            .await
        {
            tracing::error!(error = %e, "Failed to record job failure");
        }
    }
}

fn log_outcome(outcome: &CreateOutcome) {
    match outcome {
        CreateOutcome::Created(product) => {
            tracing::info!(product_id = %product.id, "Import created product");
        }
        CreateOutcome::Duplicate(existing) => {
            tracing::info!(existing_id = %existing.id, "Import skipped duplicate");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use shelfwise_core::{CertNumber, ShopDomain};

    #[test]
    fn failure_titles_name_the_input() {
        let shop = ShopDomain::parse("acme.myshopify.com").unwrap();
        let err = JobError::Timeout(Duration::from_secs(300));

        let import = Job::ImportRetailerProduct {
            shop: shop.clone(),
            url: "https://retailer.example.com/products/mug".to_string(),
        };
        assert_eq!(
            failure_title(&import, &err),
            "Import of https://retailer.example.com/products/mug failed: job timed out after 300s"
        );

        let psa = Job::ImportPsaCert {
            shop,
            cert: CertNumber::parse("12345678").unwrap(),
            price: rust_decimal::Decimal::from(10),
        };
        assert!(failure_title(&psa, &err).starts_with("PSA import of cert 12345678 failed"));
    }
}
