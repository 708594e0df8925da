//! Wishlist API for the customer storefront extension.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::instrument;

use shelfwise_core::{Email, Keyword};

use crate::{
    db::WishlistRepository,
    error::AppError,
    middleware::RequireShop,
    models::{SuggestedKeyword, Wishlist},
    state::AppState,
};

/// Build the wishlist router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/wishlist", post(wishlist))
        .route("/api/wishlist/suggested", get(suggested))
}

/// Body of `POST /api/wishlist`.
#[derive(Debug, Deserialize)]
pub struct WishlistRequest {
    /// Storefront customer id.
    pub id: Option<String>,
    pub intent: Option<String>,
    pub keyword: Option<String>,
    pub email: Option<String>,
}

/// A validated wishlist request.
#[derive(Debug, PartialEq, Eq)]
pub enum WishlistIntent {
    Get,
    AddKeyword(Keyword),
    RemoveKeyword(Keyword),
    /// `None` clears the address.
    SetEmail(Option<Email>),
}

impl WishlistRequest {
    /// Split into the customer id and the intent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a missing id, a missing or unknown
    /// intent, or an invalid keyword or email.
    pub fn into_intent(self) -> Result<(String, WishlistIntent), AppError> {
        let customer_id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("missing id".to_string()))?;

        let keyword = || -> Result<Keyword, AppError> {
            let raw = self
                .keyword
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("missing keyword".to_string()))?;
            Keyword::parse(raw).map_err(|e| AppError::BadRequest(e.to_string()))
        };

        let intent = self
            .intent
            .as_deref()
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| AppError::BadRequest("missing intent".to_string()))?;

        let intent = match intent {
            "get" => WishlistIntent::Get,
            "add_keyword" => WishlistIntent::AddKeyword(keyword()?),
            "remove_keyword" => WishlistIntent::RemoveKeyword(keyword()?),
            "set_email" => {
                let email = self
                    .email
                    .as_deref()
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(Email::parse)
                    .transpose()
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                WishlistIntent::SetEmail(email)
            }
            other => return Err(AppError::BadRequest(format!("unknown intent: {other}"))),
        };

        Ok((customer_id, intent))
    }
}

/// Apply a wishlist intent and return the resulting wishlist.
#[instrument(skip(state, body), fields(shop = %shop))]
async fn wishlist(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
    body: Result<Json<WishlistRequest>, JsonRejection>,
) -> Result<Json<Wishlist>, AppError> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (customer_id, intent) = body.into_intent()?;

    let repo = WishlistRepository::new(state.pool());
    let mut wishlist = repo.get_or_create(&shop, &customer_id).await?;

    match intent {
        WishlistIntent::Get => return Ok(Json(wishlist)),
        WishlistIntent::AddKeyword(keyword) => repo.add_keyword(wishlist.id, &keyword).await?,
        WishlistIntent::RemoveKeyword(keyword) => {
            repo.remove_keyword(wishlist.id, &keyword).await?;
        }
        WishlistIntent::SetEmail(email) => {
            repo.set_email(wishlist.id, email.as_ref()).await?;
            wishlist.email = email;
        }
    }

    wishlist.keywords = repo.list_keywords(wishlist.id).await?;
    Ok(Json(wishlist))
}

/// Merchant-curated keywords offered to customers.
async fn suggested(
    State(state): State<AppState>,
    RequireShop(shop): RequireShop,
) -> Result<Json<Vec<SuggestedKeyword>>, AppError> {
    let keywords = WishlistRepository::new(state.pool())
        .suggested_keywords(&shop)
        .await?;
    Ok(Json(keywords))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(id: Option<&str>, intent: Option<&str>) -> WishlistRequest {
        WishlistRequest {
            id: id.map(String::from),
            intent: intent.map(String::from),
            keyword: None,
            email: None,
        }
    }

    #[test]
    fn get_intent() {
        let (id, intent) = request(Some("cust_1"), Some("get")).into_intent().unwrap();
        assert_eq!(id, "cust_1");
        assert_eq!(intent, WishlistIntent::Get);
    }

    #[test]
    fn missing_intent_is_rejected() {
        let err = request(Some("cust_1"), None).into_intent().unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "missing intent"));
    }

    #[test]
    fn missing_id_is_rejected() {
        assert!(matches!(
            request(None, Some("get")).into_intent(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            request(Some("  "), Some("get")).into_intent(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn unknown_intent_is_rejected() {
        let err = request(Some("cust_1"), Some("delete_everything"))
            .into_intent()
            .unwrap_err();
        assert!(
            matches!(err, AppError::BadRequest(ref m) if m == "unknown intent: delete_everything")
        );
    }

    #[test]
    fn keyword_is_normalised() {
        let mut req = request(Some("cust_1"), Some("add_keyword"));
        req.keyword = Some("  Vintage ".to_string());
        let (_, intent) = req.into_intent().unwrap();
        assert_eq!(intent, WishlistIntent::AddKeyword(Keyword::parse("vintage").unwrap()));

        let req = request(Some("cust_1"), Some("remove_keyword"));
        assert!(req.into_intent().is_err());
    }

    #[test]
    fn email_can_be_set_or_cleared() {
        let mut req = request(Some("cust_1"), Some("set_email"));
        req.email = Some("ada@example.com".to_string());
        let (_, intent) = req.into_intent().unwrap();
        assert_eq!(
            intent,
            WishlistIntent::SetEmail(Some(Email::parse("ada@example.com").unwrap()))
        );

        let (_, intent) = request(Some("cust_1"), Some("set_email")).into_intent().unwrap();
        assert_eq!(intent, WishlistIntent::SetEmail(None));

        let mut req = request(Some("cust_1"), Some("set_email"));
        req.email = Some("not-an-email".to_string());
        assert!(req.into_intent().is_err());
    }
}
