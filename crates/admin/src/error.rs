//! Unified error handling for the HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::jobs::JobError;
use crate::scraper::ScraperError;
use crate::services::{ComplianceError, ProductError, SessionError};
use crate::shopify::AdminShopifyError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Shopify API operation failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    /// A scrape of a third-party page failed.
    #[error("Scrape failed: {0}")]
    Scraper(#[from] ScraperError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The shop has no usable session.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The job queue cannot take more work.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoSession(shop) => Self::Unauthorized(format!("no session for {shop}")),
            SessionError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<ComplianceError> for AppError {
    fn from(err: ComplianceError) -> Self {
        match err {
            ComplianceError::Session(e) => e.into(),
            ComplianceError::Shopify(e) => Self::Shopify(e),
            ComplianceError::Repository(e) => Self::Database(e),
            ComplianceError::Email(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::Validation(msg) => Self::BadRequest(msg),
            ProductError::Session(e) => e.into(),
            ProductError::Shopify(e) | ProductError::Incomplete { source: e, .. } => {
                Self::Shopify(e)
            }
            ProductError::Scraper(e) => Self::Scraper(e),
            ProductError::Repository(e) => Self::Database(e),
            ProductError::ImageDownload(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Compliance(e) => e.into(),
            JobError::Product(e) => e.into(),
            JobError::QueueFull | JobError::QueueClosed => Self::Unavailable(err.to_string()),
            JobError::Timeout(_) => Self::Internal(err.to_string()),
        }
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Scraper(ScraperError::InvalidUrl { .. }) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Shopify(_) | Self::Scraper(_) => StatusCode::BAD_GATEWAY,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Client errors carry the bare message; internal details stay hidden
        let message = match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Shopify(_) => "External service error".to_string(),
            Self::Scraper(e) => e.to_string(),
            Self::NotFound(message)
            | Self::Unauthorized(message)
            | Self::BadRequest(message)
            | Self::Unavailable(message) => message,
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
