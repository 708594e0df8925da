//! Merchant notification feed.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use shelfwise_core::NotificationId;

use crate::{
    db::NotificationRepository, error::AppError, middleware::RequireMerchant, models::Notification,
    state::AppState,
};

/// Build the notifications router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list))
        .route("/api/notifications/clear", post(clear))
}

/// Body of `POST /api/notifications/clear`; no ids clears everything.
#[derive(Debug, Default, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub ids: Vec<NotificationId>,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: u64,
}

async fn list(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = NotificationRepository::new(state.pool())
        .list_unshown(&shop)
        .await?;
    Ok(Json(notifications))
}

async fn clear(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    body: Option<Json<ClearRequest>>,
) -> Result<Json<ClearResponse>, AppError> {
    let Json(body) = body.unwrap_or_default();
    let cleared = NotificationRepository::new(state.pool())
        .mark_shown(&shop, &body.ids)
        .await?;
    Ok(Json(ClearResponse { cleared }))
}
