//! Domain types returned by the Shopify Admin client.
//!
//! These are the shapes the rest of the service works with; the raw
//! GraphQL response structs live in `admin::queries` and are converted in
//! `admin::conversions`.

use serde::{Deserialize, Serialize};
use shelfwise_core::ProductStatus;

// =============================================================================
// Catalog
// =============================================================================

/// A product with the inventory of each variant at one location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Product GID (`gid://shopify/Product/123`).
    pub id: String,
    pub title: String,
    pub handle: String,
    pub status: ProductStatus,
    pub tags: Vec<String>,
    /// Storefront URL when the product is published to the online store.
    pub online_store_url: Option<String>,
    pub variants: Vec<CatalogVariant>,
}

impl CatalogProduct {
    /// Sum of available quantities across all variants.
    ///
    /// Negative quantities (oversold variants) count as zero so one oversold
    /// variant cannot hide stock on another.
    #[must_use]
    pub fn total_inventory(&self) -> i64 {
        self.variants.iter().map(|v| v.available.max(0)).sum()
    }

    /// Whether the product carries `tag`, ignoring case.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// A purchasable variant with its available quantity at the queried location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogVariant {
    pub id: String,
    pub title: String,
    pub sku: Option<String>,
    pub inventory_item_id: Option<String>,
    /// Available quantity; zero when the item is not stocked at the location.
    pub available: i64,
}

/// One page of catalog products.
#[derive(Debug, Clone)]
pub struct CatalogPage {
    pub products: Vec<CatalogProduct>,
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Minimal product record used for duplicate detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    pub status: ProductStatus,
}

// =============================================================================
// Locations
// =============================================================================

/// An inventory-holding site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub is_active: bool,
}

// =============================================================================
// Product creation
// =============================================================================

/// Input for `productCreate`.
#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub title: String,
    pub description_html: Option<String>,
    pub vendor: Option<String>,
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    pub status: ProductStatus,
    /// Media sources: staged upload resource URLs or public image URLs.
    pub media: Vec<String>,
}

/// The identifiers of a freshly created product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedProduct {
    pub id: String,
    pub handle: String,
    pub title: String,
    /// The default variant Shopify creates with every product.
    pub variant_id: Option<String>,
    pub inventory_item_id: Option<String>,
}

/// REST update for a variant's commercial fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariantUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

/// REST update for an inventory item.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InventoryItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracked: Option<bool>,
}

/// Upload target returned by `stagedUploadsCreate`.
#[derive(Debug, Clone)]
pub struct StagedUploadTarget {
    /// URL to POST the multipart form to.
    pub url: String,
    /// URL to reference the uploaded file in `productCreate` media.
    pub resource_url: String,
    /// Form fields that must precede the file part.
    pub parameters: Vec<(String, String)>,
}

// =============================================================================
// Webhooks
// =============================================================================

/// A registered webhook subscription (diagnostics only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSubscription {
    pub id: String,
    pub topic: String,
    pub format: String,
    pub callback_url: Option<String>,
    pub created_at: String,
}

/// Extract the numeric id from a Shopify GID.
///
/// `gid://shopify/ProductVariant/4455` → `Some(4455)`.
#[must_use]
pub fn legacy_id(gid: &str) -> Option<u64> {
    gid.rsplit('/').next()?.split('?').next()?.parse().ok()
}
