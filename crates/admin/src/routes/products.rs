//! Product creation and import endpoints.
//!
//! Manual creation runs inline; imports are queued and answered with 202.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::post,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use shelfwise_core::{CertNumber, NotificationKind};

use crate::{
    db::NotificationRepository,
    error::AppError,
    jobs::Job,
    middleware::RequireMerchant,
    services::{CreateOutcome, ProductDraft},
    state::AppState,
};

/// Build the products router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", post(create))
        .route("/api/products/import", post(import))
        .route("/api/products/import-collection", post(import_collection))
        .route("/api/products/psa", post(import_psa))
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsaImportRequest {
    pub cert_number: String,
    pub price: Decimal,
}

/// Response for queued work.
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: usize,
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(b)| b)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Create a product from a merchant-entered draft.
#[instrument(skip(state, body), fields(shop = %shop))]
async fn create(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    body: Result<Json<ProductDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateOutcome>), AppError> {
    let draft = json_body(body)?;
    let title = draft.title.clone();

    match state.products().create(&shop, draft).await {
        Ok(outcome @ CreateOutcome::Created(_)) => Ok((StatusCode::CREATED, Json(outcome))),
        Ok(outcome @ CreateOutcome::Duplicate(_)) => Ok((StatusCode::OK, Json(outcome))),
        Err(e) => {
            let err = AppError::from(e);
            if err.status().is_server_error()
                && let Err(db_err) = NotificationRepository::new(state.pool())
                    .create(&shop, &format!("Failed to create {title}: {err}"), NotificationKind::Error)
                    .await
            {
                tracing::error!(error = %db_err, "Failed to record notification");
            }
            Err(err)
        }
    }
}

/// Queue a retailer product page import.
async fn import(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QueuedResponse>), AppError> {
    let request = json_body(body)?;
    let url = state.products().retailer().resolve_url(&request.url)?;

    state.jobs().enqueue(Job::ImportRetailerProduct {
        shop,
        url: url.to_string(),
    })?;
    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { queued: 1 })))
}

/// Scrape a collection page and queue one import per product found.
#[instrument(skip(state, body), fields(shop = %shop))]
async fn import_collection(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QueuedResponse>), AppError> {
    let request = json_body(body)?;
    let urls = state.products().retailer().fetch_collection(&request.url).await?;

    for url in &urls {
        state.jobs().enqueue(Job::ImportRetailerProduct {
            shop: shop.clone(),
            url: url.clone(),
        })?;
    }

    tracing::info!(queued = urls.len(), "Collection import queued");
    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { queued: urls.len() })))
}

/// Queue a PSA certificate import.
async fn import_psa(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    body: Result<Json<PsaImportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<QueuedResponse>), AppError> {
    let request = json_body(body)?;
    let cert = CertNumber::parse(&request.cert_number)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if request.price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".to_string()));
    }

    state.jobs().enqueue(Job::ImportPsaCert {
        shop,
        cert,
        price: request.price,
    })?;
    Ok((StatusCode::ACCEPTED, Json(QueuedResponse { queued: 1 })))
}
