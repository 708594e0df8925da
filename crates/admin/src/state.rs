//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use crate::config::AppConfig;
use crate::jobs::{AutomationRunner, JobQueue, JobQueueHandle};
use crate::scraper::{PsaClient, RetailerScraper, ScraperError};
use crate::services::{ComplianceService, EmailService, ProductCreator, SessionResolver};

/// Error wiring the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("SMTP setup failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("scraper setup failed: {0}")]
    Scraper(#[from] ScraperError),
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// pool, the session resolver and the services built on it.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    sessions: SessionResolver,
    compliance: ComplianceService,
    products: ProductCreator,
    jobs: JobQueue,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        config: AppConfig,
        pool: PgPool,
        sessions: SessionResolver,
        compliance: ComplianceService,
        products: ProductCreator,
        jobs: JobQueue,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                sessions,
                compliance,
                products,
                jobs,
            }),
        }
    }

    /// Wire every service from configuration and start the job worker.
    ///
    /// The returned handle owns the worker; call `shutdown` on it when the
    /// server stops.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP transport, the HTTP client or a scraper
    /// cannot be built.
    pub fn from_config(config: AppConfig, pool: PgPool) -> Result<(Self, JobQueueHandle), StateError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let sessions = SessionResolver::new(pool.clone(), http.clone(), &config.shopify);

        let email = EmailService::new(&config.email)?;
        let compliance = ComplianceService::new(sessions.clone(), email, config.automation.clone());

        let retailer = RetailerScraper::new(&config.scraper)?;
        let psa = config
            .scraper
            .psa
            .as_ref()
            .map(|browser| PsaClient::new(browser, &config.scraper))
            .transpose()?;
        if psa.is_none() {
            tracing::info!("PSA browser service not configured, PSA imports disabled");
        }
        let products = ProductCreator::new(sessions.clone(), http, retailer, psa);

        let runner = AutomationRunner::new(compliance.clone(), products.clone(), pool.clone());
        let handle = JobQueue::start(Arc::new(runner), config.jobs.clone());

        let state = Self::new(config, pool, sessions, compliance, products, handle.queue());
        Ok((state, handle))
    }

    /// Get a reference to the service configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the shop session resolver.
    #[must_use]
    pub fn sessions(&self) -> &SessionResolver {
        &self.inner.sessions
    }

    /// Get the inventory compliance service.
    #[must_use]
    pub fn compliance(&self) -> &ComplianceService {
        &self.inner.compliance
    }

    /// Get the product creator.
    #[must_use]
    pub fn products(&self) -> &ProductCreator {
        &self.inner.products
    }

    /// Get the background job queue.
    #[must_use]
    pub fn jobs(&self) -> &JobQueue {
        &self.inner.jobs
    }
}
