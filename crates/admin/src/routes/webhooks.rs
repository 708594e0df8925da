//! Shopify webhook receivers.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use shelfwise_core::ShopDomain;

use crate::{
    error::AppError,
    jobs::Job,
    shopify::webhook::{HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER, verify_webhook_hmac},
    state::AppState,
};

/// Build the webhooks router.
pub fn router() -> Router<AppState> {
    Router::new().route("/webhooks/inventory", post(inventory))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Inventory level changed: queue a compliance check for the shop.
async fn inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let signature = header(&headers, HMAC_HEADER)
        .ok_or_else(|| AppError::Unauthorized("missing webhook signature".to_string()))?;
    let secret = state.config().shopify.api_secret.expose_secret();
    if !verify_webhook_hmac(&body, signature, secret) {
        tracing::warn!("Rejected webhook with invalid signature");
        return Err(AppError::Unauthorized("invalid webhook signature".to_string()));
    }

    let shop = header(&headers, SHOP_DOMAIN_HEADER)
        .ok_or_else(|| AppError::BadRequest("missing shop domain".to_string()))
        .and_then(|raw| ShopDomain::parse(raw).map_err(|e| AppError::BadRequest(e.to_string())))?;

    tracing::info!(
        shop = %shop,
        topic = header(&headers, TOPIC_HEADER).unwrap_or("unknown"),
        "Inventory webhook received"
    );

    state.jobs().enqueue(Job::CheckCompliance { shop })?;
    Ok((StatusCode::OK, Json(json!({ "queued": 1 }))))
}
