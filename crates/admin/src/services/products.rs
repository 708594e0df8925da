//! Product creation: manual entry, retailer imports and PSA imports.
//!
//! Every path ends in [`ProductCreator::create`], which skips probable
//! duplicates, stages images, creates the product, fills in the variant and
//! inventory item over REST, and stocks the primary location.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use shelfwise_core::{CertNumber, NotificationKind, ProductStatus, ShopDomain};

use super::sessions::{SessionError, SessionResolver};
use crate::db::{NotificationRepository, RepositoryError};
use crate::scraper::{PsaCert, PsaClient, RetailerScraper, ScrapedProduct, ScraperError};
use crate::shopify::{
    AdminClient, AdminShopifyError, CreatedProduct, InventoryItemUpdate, NewProduct,
    ProductSummary, VariantUpdate,
};

/// Maximum product title length Shopify accepts.
pub const MAX_TITLE_LEN: usize = 255;

/// Errors from product creation.
#[derive(Debug, Error)]
pub enum ProductError {
    /// The draft failed validation.
    #[error("Invalid product: {0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Shopify error: {0}")]
    Shopify(#[from] AdminShopifyError),

    #[error("Scrape failed: {0}")]
    Scraper(#[from] ScraperError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Image download for a staged upload failed.
    #[error("Image download failed: {0}")]
    ImageDownload(#[from] reqwest::Error),

    /// The product was created but a follow-up step failed and the product
    /// could not be deleted again. It needs the merchant's attention.
    #[error("product {product_id} was created but left incomplete: {source}")]
    Incomplete {
        product_id: String,
        #[source]
        source: AdminShopifyError,
    },
}

/// Product input before it reaches Shopify.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub title: String,
    #[serde(default)]
    pub description_html: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub image_urls: Vec<String>,
    /// Overrides the stock-derived default.
    #[serde(default)]
    pub status: Option<ProductStatus>,
}

impl ProductDraft {
    /// Check the draft before any API call.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::Validation` describing the first problem.
    pub fn validate(&self) -> Result<(), ProductError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ProductError::Validation("title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ProductError::Validation(format!(
                "title exceeds {MAX_TITLE_LEN} characters"
            )));
        }
        if self.price.is_some_and(|p| p.is_sign_negative()) {
            return Err(ProductError::Validation("price must not be negative".to_string()));
        }
        if self.cost.is_some_and(|c| c.is_sign_negative()) {
            return Err(ProductError::Validation("cost must not be negative".to_string()));
        }
        if self.quantity < 0 {
            return Err(ProductError::Validation("quantity must not be negative".to_string()));
        }
        Ok(())
    }

    /// Explicit status, else Draft without stock and Active with stock.
    #[must_use]
    pub fn status(&self) -> ProductStatus {
        self.status.unwrap_or(if self.quantity == 0 {
            ProductStatus::Draft
        } else {
            ProductStatus::Active
        })
    }

    fn new_product(&self, media: Vec<String>) -> NewProduct {
        NewProduct {
            title: self.title.trim().to_string(),
            description_html: self.description_html.clone(),
            vendor: self.vendor.clone(),
            product_type: self.product_type.clone(),
            tags: self.tags.clone(),
            status: self.status(),
            media,
        }
    }

    fn variant_update(&self) -> Option<VariantUpdate> {
        let update = VariantUpdate {
            price: self.price.map(|p| p.to_string()),
            compare_at_price: None,
            sku: self.sku.clone(),
            barcode: self.barcode.clone(),
        };
        (update.price.is_some() || update.sku.is_some() || update.barcode.is_some())
            .then_some(update)
    }

    /// Draft for a graded card; one copy in stock.
    #[must_use]
    pub fn from_psa_cert(card: &PsaCert, price: Decimal) -> Self {
        Self {
            title: card.product_title(),
            description_html: Some(card.description_html()),
            vendor: card.brand.clone(),
            product_type: Some("Graded Card".to_string()),
            tags: card.tags(),
            price: Some(price),
            sku: Some(format!("PSA-{}", card.cert_number)),
            quantity: 1,
            image_urls: card.image_urls(),
            ..Self::default()
        }
    }
}

impl From<ScrapedProduct> for ProductDraft {
    /// Retailer imports arrive without stock, so they land as Draft for the
    /// merchant to review.
    fn from(scraped: ScrapedProduct) -> Self {
        Self {
            title: scraped.title,
            description_html: scraped.description_html,
            vendor: scraped.vendor,
            price: scraped.price,
            sku: scraped.sku,
            image_urls: scraped.image_urls,
            ..Self::default()
        }
    }
}

/// Result of a create request.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "product", rename_all = "snake_case")]
pub enum CreateOutcome {
    Created(CreatedProduct),
    /// An existing product looks like the same item; nothing was created.
    Duplicate(ProductSummary),
}

/// Whether `existing` and `candidate` probably name the same product:
/// either title contains the other, ignoring case and outer whitespace.
#[must_use]
pub fn is_probable_duplicate(existing: &str, candidate: &str) -> bool {
    let existing = existing.trim().to_lowercase();
    let candidate = candidate.trim().to_lowercase();
    if existing.is_empty() || candidate.is_empty() {
        return false;
    }
    existing.contains(&candidate) || candidate.contains(&existing)
}

/// File name for a staged upload, taken from the URL's last path segment.
#[must_use]
pub fn image_filename(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty() && name.contains('.'))
        .map_or_else(|| "image.jpg".to_string(), ToString::to_string)
}

/// MIME type from a file extension; JPEG when unknown.
#[must_use]
pub fn image_mime(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

/// Creates products in a shop's catalog.
#[derive(Clone)]
pub struct ProductCreator {
    sessions: SessionResolver,
    http: reqwest::Client,
    retailer: RetailerScraper,
    psa: Option<PsaClient>,
}

impl ProductCreator {
    /// `psa` is `None` when no browser service is configured; PSA imports
    /// then fail with `ScraperError::NotConfigured`.
    #[must_use]
    pub const fn new(
        sessions: SessionResolver,
        http: reqwest::Client,
        retailer: RetailerScraper,
        psa: Option<PsaClient>,
    ) -> Self {
        Self {
            sessions,
            http,
            retailer,
            psa,
        }
    }

    /// The retailer scraper (collection fan-out happens at the route).
    #[must_use]
    pub const fn retailer(&self) -> &RetailerScraper {
        &self.retailer
    }

    /// Create a product unless a probable duplicate exists.
    ///
    /// Success and skipped duplicates are recorded as notifications;
    /// failures are left to the caller, which knows whether a retry follows.
    ///
    /// # Errors
    ///
    /// Returns an error if validation, the session lookup, or any Shopify
    /// call fails. Image staging failures fall back to the source URL.
    #[instrument(skip(self, draft), fields(shop = %shop, title = %draft.title))]
    pub async fn create(
        &self,
        shop: &ShopDomain,
        draft: ProductDraft,
    ) -> Result<CreateOutcome, ProductError> {
        draft.validate()?;
        let client = self.sessions.resolve(shop).await?;

        let existing = client.find_products_by_title(draft.title.trim()).await?;
        if let Some(duplicate) = existing
            .into_iter()
            .find(|p| is_probable_duplicate(&p.title, &draft.title))
        {
            tracing::info!(existing_id = %duplicate.id, "Skipping probable duplicate");
            self.notify(
                shop,
                &format!("Skipped {}: matches existing product {}", draft.title, duplicate.title),
                NotificationKind::Warning,
            )
            .await;
            return Ok(CreateOutcome::Duplicate(duplicate));
        }

        let media = self.stage_images(&client, &draft.image_urls).await;

        let created = Self::create_in_shop(&client, &draft, media).await?;
        tracing::info!(product_id = %created.id, "Product created");
        self.notify(shop, &format!("Created {}", created.title), NotificationKind::Success)
            .await;
        Ok(CreateOutcome::Created(created))
    }

    /// Scrape a retailer product page and create it.
    ///
    /// # Errors
    ///
    /// Returns an error if the scrape or the creation fails.
    #[instrument(skip(self), fields(shop = %shop))]
    pub async fn import_from_retailer(
        &self,
        shop: &ShopDomain,
        url: &str,
    ) -> Result<CreateOutcome, ProductError> {
        let scraped = self.retailer.fetch_product(url).await?;
        self.create(shop, scraped.into()).await
    }

    /// Look up a PSA certificate and create the graded card.
    ///
    /// # Errors
    ///
    /// Returns an error if PSA lookups are not configured, the lookup fails,
    /// or the creation fails.
    #[instrument(skip(self), fields(shop = %shop, cert = %cert))]
    pub async fn import_psa_cert(
        &self,
        shop: &ShopDomain,
        cert: &CertNumber,
        price: Decimal,
    ) -> Result<CreateOutcome, ProductError> {
        let psa = self
            .psa
            .as_ref()
            .ok_or(ScraperError::NotConfigured("PSA browser service"))?;
        let card = psa.lookup(cert).await?;
        self.create(shop, ProductDraft::from_psa_cert(&card, price)).await
    }

    /// Create the product and fill in price, cost and stock. If any
    /// follow-up step fails the product is deleted again, so a retry starts
    /// from a clean catalog instead of finding a half-made duplicate.
    async fn create_in_shop(
        client: &AdminClient,
        draft: &ProductDraft,
        media: Vec<String>,
    ) -> Result<CreatedProduct, ProductError> {
        let created = client.create_product(&draft.new_product(media)).await?;

        if let Err(e) = Self::complete(client, draft, &created).await {
            tracing::warn!(product_id = %created.id, error = %e, "Follow-up step failed, deleting product");
            if let Err(rollback) = client.delete_product(&created.id).await {
                tracing::error!(product_id = %created.id, error = %rollback, "Rollback failed");
                return Err(ProductError::Incomplete {
                    product_id: created.id,
                    source: e,
                });
            }
            return Err(e.into());
        }

        Ok(created)
    }

    async fn complete(
        client: &AdminClient,
        draft: &ProductDraft,
        created: &CreatedProduct,
    ) -> Result<(), AdminShopifyError> {
        if let (Some(variant_id), Some(update)) = (&created.variant_id, draft.variant_update()) {
            client.update_variant(variant_id, &update).await?;
        }

        if let Some(item_id) = &created.inventory_item_id {
            client
                .update_inventory_item(
                    item_id,
                    &InventoryItemUpdate {
                        cost: draft.cost.map(|c| c.to_string()),
                        tracked: Some(true),
                    },
                )
                .await?;

            let location = client.get_primary_location().await?;
            client
                .set_inventory_quantity(item_id, &location.id, draft.quantity)
                .await?;
        }

        Ok(())
    }

    /// Stage every image, keeping the source URL for any that fail.
    async fn stage_images(&self, client: &AdminClient, urls: &[String]) -> Vec<String> {
        let mut media = Vec::with_capacity(urls.len());
        for url in urls {
            match self.stage_image(client, url).await {
                Ok(resource_url) => media.push(resource_url),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Staged upload failed, using source URL");
                    media.push(url.clone());
                }
            }
        }
        media
    }

    async fn stage_image(&self, client: &AdminClient, url: &str) -> Result<String, ProductError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let filename = image_filename(url);
        let mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("image/"))
            .map_or_else(|| image_mime(&filename).to_string(), |v| {
                v.split(';').next().unwrap_or(v).trim().to_string()
            });
        let bytes = response.bytes().await?.to_vec();

        let target = client.create_staged_upload(&filename, &mime).await?;
        Ok(client
            .upload_to_staged_target(&target, &filename, &mime, bytes)
            .await?)
    }

    async fn notify(&self, shop: &ShopDomain, title: &str, kind: NotificationKind) {
        if let Err(e) = NotificationRepository::new(self.sessions.pool())
            .create(shop, title, kind)
            .await
        {
            tracing::error!(error = %e, "Failed to record notification");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn draft(title: &str) -> ProductDraft {
        ProductDraft {
            title: title.to_string(),
            ..ProductDraft::default()
        }
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert!(draft("Blue Mug").validate().is_ok());
        assert!(draft("   ").validate().is_err());
        assert!(draft(&"x".repeat(MAX_TITLE_LEN + 1)).validate().is_err());
        assert!(draft(&"x".repeat(MAX_TITLE_LEN)).validate().is_ok());

        let mut negative = draft("Blue Mug");
        negative.price = Some(Decimal::from_str("-1.00").unwrap());
        assert!(matches!(negative.validate(), Err(ProductError::Validation(_))));

        let mut zero = draft("Blue Mug");
        zero.price = Some(Decimal::ZERO);
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn status_follows_stock_unless_given() {
        let mut d = draft("Blue Mug");
        assert_eq!(d.status(), ProductStatus::Draft);
        d.quantity = 3;
        assert_eq!(d.status(), ProductStatus::Active);
        d.status = Some(ProductStatus::Draft);
        assert_eq!(d.status(), ProductStatus::Draft);
    }

    #[test]
    fn variant_update_only_when_fields_present() {
        assert!(draft("Blue Mug").variant_update().is_none());

        let mut d = draft("Blue Mug");
        d.price = Some(Decimal::from_str("19.99").unwrap());
        let update = d.variant_update().unwrap();
        assert_eq!(update.price.as_deref(), Some("19.99"));
        assert!(update.sku.is_none());
    }

    #[test]
    fn duplicate_heuristic() {
        assert!(is_probable_duplicate("Blue Mug", "blue mug"));
        assert!(is_probable_duplicate("Blue Mug - Large", "Blue Mug"));
        assert!(is_probable_duplicate("Mug", "Blue Mug"));
        assert!(!is_probable_duplicate("Red Mug", "Blue Mug"));
        assert!(!is_probable_duplicate("", "Blue Mug"));
    }

    #[test]
    fn image_names_and_types() {
        assert_eq!(image_filename("https://cdn.example.com/a/b/card-front.PNG?v=3"), "card-front.PNG");
        assert_eq!(image_mime("card-front.PNG"), "image/png");
        assert_eq!(image_filename("https://cdn.example.com/images/"), "image.jpg");
        assert_eq!(image_mime("photo"), "image/jpeg");
        assert_eq!(image_mime("x.webp"), "image/webp");
    }

    #[test]
    fn draft_from_psa_cert() {
        let card = PsaCert {
            cert_number: CertNumber::parse("12345678").unwrap(),
            grade: "GEM MT 10".to_string(),
            year: Some("1999".to_string()),
            brand: Some("Pokemon Game".to_string()),
            subject: "Charizard-Holo".to_string(),
            card_number: Some("4".to_string()),
            variety: None,
            front_image: Some("https://img.example.com/front.jpg".to_string()),
            back_image: None,
            source_url: "https://www.psacard.com/cert/12345678/psa".to_string(),
        };
        let d = ProductDraft::from_psa_cert(&card, Decimal::from(250));
        assert_eq!(d.title, "1999 Pokemon Game Charizard-Holo #4 PSA 10");
        assert_eq!(d.quantity, 1);
        assert_eq!(d.status(), ProductStatus::Active);
        assert_eq!(d.sku.as_deref(), Some("PSA-12345678"));
        assert_eq!(d.image_urls.len(), 1);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn draft_from_scrape_lands_as_draft() {
        let scraped = ScrapedProduct {
            title: "Blue Mug".to_string(),
            price: Some(Decimal::from(12)),
            description_html: None,
            vendor: Some("Acme".to_string()),
            sku: None,
            image_urls: vec![],
            source_url: "https://shop.example.com/products/blue-mug".to_string(),
        };
        let d = ProductDraft::from(scraped);
        assert_eq!(d.status(), ProductStatus::Draft);
        assert_eq!(d.vendor.as_deref(), Some("Acme"));
    }

    #[test]
    fn draft_deserializes_camel_case() {
        let d: ProductDraft = serde_json::from_str(
            r#"{"title":"Blue Mug","price":"19.99","quantity":2,"imageUrls":["https://x/y.jpg"]}"#,
        )
        .unwrap();
        assert_eq!(d.quantity, 2);
        assert_eq!(d.image_urls.len(), 1);
        assert_eq!(d.price, Some(Decimal::from_str("19.99").unwrap()));
    }
}
