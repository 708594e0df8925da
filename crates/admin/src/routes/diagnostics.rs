//! Operational endpoints for the merchant app.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    error::AppError, middleware::RequireMerchant, services::ComplianceReport,
    shopify::WebhookSubscription, state::AppState,
};

/// Build the diagnostics router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/diagnostics/webhooks", get(webhooks))
        .route("/api/diagnostics/inventory-check", post(inventory_check))
}

/// Webhook subscriptions registered for the shop.
async fn webhooks(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
) -> Result<Json<Vec<WebhookSubscription>>, AppError> {
    let client = state.sessions().resolve(&shop).await?;
    Ok(Json(client.list_webhook_subscriptions().await?))
}

/// Run the compliance sweep now and return its report.
async fn inventory_check(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
) -> Result<Json<ComplianceReport>, AppError> {
    Ok(Json(state.compliance().check_shop(&shop).await?))
}
