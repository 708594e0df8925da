//! Customer wishlist models.

use serde::Serialize;
use shelfwise_core::{Email, Keyword, ShopDomain, SuggestedKeywordId, WishlistId};

/// A customer's wishlist with its keywords, ordered by value.
///
/// Serialized as the wishlist extension's response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wishlist {
    pub id: WishlistId,
    #[serde(skip)]
    pub shop: ShopDomain,
    pub customer_id: String,
    pub email: Option<Email>,
    pub keywords: Vec<Keyword>,
}

/// A merchant-curated keyword offered in the extension.
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedKeyword {
    pub id: SuggestedKeywordId,
    pub value: Keyword,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wishlist(keywords: &[&str]) -> Wishlist {
        Wishlist {
            id: WishlistId::new(1),
            shop: ShopDomain::parse("demo.myshopify.com").unwrap(),
            customer_id: "cust_1".to_string(),
            email: None,
            keywords: keywords.iter().map(|k| Keyword::parse(k).unwrap()).collect(),
        }
    }

    #[test]
    fn test_response_shape() {
        let json = serde_json::to_value(wishlist(&["vintage"])).unwrap();
        assert_eq!(json["customerId"], "cust_1");
        assert_eq!(json["keywords"][0], "vintage");
        assert!(json["email"].is_null());
        assert!(json.get("shop").is_none());
    }
}
