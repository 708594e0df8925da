//! Merchant-managed suggested keywords.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use shelfwise_core::Keyword;

use crate::{
    db::WishlistRepository, error::AppError, middleware::RequireMerchant, models::SuggestedKeyword,
    state::AppState,
};

/// Build the suggested keywords router.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/suggested-keywords",
        get(list).post(add).delete(remove),
    )
}

#[derive(Debug, Deserialize)]
pub struct KeywordRequest {
    pub keyword: String,
}

fn parse_keyword(body: Result<Json<KeywordRequest>, JsonRejection>) -> Result<Keyword, AppError> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    Keyword::parse(&body.keyword).map_err(|e| AppError::BadRequest(e.to_string()))
}

async fn list(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
) -> Result<Json<Vec<SuggestedKeyword>>, AppError> {
    Ok(Json(
        WishlistRepository::new(state.pool())
            .suggested_keywords(&shop)
            .await?,
    ))
}

async fn add(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    body: Result<Json<KeywordRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SuggestedKeyword>), AppError> {
    let keyword = parse_keyword(body)?;
    let added = WishlistRepository::new(state.pool())
        .add_suggested_keyword(&shop, &keyword)
        .await?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn remove(
    State(state): State<AppState>,
    RequireMerchant(shop): RequireMerchant,
    body: Result<Json<KeywordRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let keyword = parse_keyword(body)?;
    WishlistRepository::new(state.pool())
        .remove_suggested_keyword(&shop, &keyword)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
