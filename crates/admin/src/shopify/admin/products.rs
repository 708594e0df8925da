//! Product reads and writes for the Admin API.

use shelfwise_core::ProductStatus;
use tracing::instrument;

use super::{
    AdminClient, AdminShopifyError,
    conversions::{
        convert_catalog_page, convert_created_product, convert_product_summaries,
        convert_staged_target,
    },
    queries::{
        self, GetProductsWithInventory, ProductCreate, ProductDelete, ProductUpdateStatus,
        SearchProducts, StagedUploadsCreate, user_error_message,
    },
};
use crate::shopify::types::{
    CatalogPage, CatalogProduct, CreatedProduct, NewProduct, ProductSummary, StagedUploadTarget,
    VariantUpdate, legacy_id,
};

/// Upper bound on catalog pages walked in one pass.
const MAX_CATALOG_PAGES: usize = 100;

/// Page size for catalog reads. Each product pulls up to 100 variants, so
/// this stays well below the query cost limit.
const CATALOG_PAGE_SIZE: i64 = 50;

impl AdminClient {
    /// Get one page of products with per-variant inventory at a location.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn get_products_with_inventory(
        &self,
        location_id: &str,
        first: i64,
        after: Option<String>,
    ) -> Result<CatalogPage, AdminShopifyError> {
        let variables = queries::get_products_with_inventory::Variables {
            first,
            after,
            location_id: location_id.to_string(),
        };

        let response = self.execute::<GetProductsWithInventory>(variables).await?;

        Ok(convert_catalog_page(response.products))
    }

    /// Walk every catalog page for a location.
    ///
    /// # Errors
    ///
    /// Returns an error if any page fails, or
    /// `AdminShopifyError::PaginationLimit` if the cursor never ends.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn get_all_products_with_inventory(
        &self,
        location_id: &str,
    ) -> Result<Vec<CatalogProduct>, AdminShopifyError> {
        let mut products = Vec::new();
        let mut cursor = None;

        for _ in 0..MAX_CATALOG_PAGES {
            let page = self
                .get_products_with_inventory(location_id, CATALOG_PAGE_SIZE, cursor)
                .await?;
            products.extend(page.products);

            match (page.has_next_page, page.end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => return Ok(products),
            }
        }

        Err(AdminShopifyError::PaginationLimit(MAX_CATALOG_PAGES))
    }

    /// Find products whose title matches `title` in Shopify search.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn find_products_by_title(
        &self,
        title: &str,
    ) -> Result<Vec<ProductSummary>, AdminShopifyError> {
        let escaped = title.replace('\\', "\\\\").replace('"', "\\\"");
        let variables = queries::search_products::Variables {
            first: 10,
            query: format!("title:\"{escaped}\""),
        };

        let response = self.execute::<SearchProducts>(variables).await?;

        Ok(convert_product_summaries(response.products))
    }

    /// Change a product's publication status.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(shop = %self.shop(), product_id = %product_id, status = %status))]
    pub async fn update_product_status(
        &self,
        product_id: &str,
        status: ProductStatus,
    ) -> Result<(), AdminShopifyError> {
        let variables = queries::product_update_status::Variables {
            product: queries::product_update_status::ProductUpdateInput {
                id: product_id.to_string(),
                status: status.as_graphql().to_string(),
            },
        };

        let response = self.execute::<ProductUpdateStatus>(variables).await?;

        let payload = response.product_update.ok_or_else(|| {
            AdminShopifyError::NotFound(format!("Product {product_id} not found"))
        })?;
        if let Some(message) = user_error_message(&payload.user_errors) {
            return Err(AdminShopifyError::UserError(message));
        }

        Ok(())
    }

    /// Create a product with optional media.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self, product), fields(shop = %self.shop(), title = %product.title))]
    pub async fn create_product(
        &self,
        product: &NewProduct,
    ) -> Result<CreatedProduct, AdminShopifyError> {
        use queries::product_create::{CreateMediaInput, ProductCreateInput, Variables};

        let variables = Variables {
            product: ProductCreateInput {
                title: product.title.clone(),
                description_html: product.description_html.clone(),
                vendor: product.vendor.clone(),
                product_type: product.product_type.clone(),
                tags: product.tags.clone(),
                status: product.status.as_graphql().to_string(),
            },
            media: product
                .media
                .iter()
                .map(|source| CreateMediaInput {
                    original_source: source.clone(),
                    media_content_type: "IMAGE".to_string(),
                    alt: Some(product.title.clone()),
                })
                .collect(),
        };

        let response = self.execute::<ProductCreate>(variables).await?;

        let payload = response.product_create.ok_or_else(|| {
            AdminShopifyError::UserError("productCreate returned no payload".to_string())
        })?;
        if let Some(message) = user_error_message(&payload.user_errors) {
            return Err(AdminShopifyError::UserError(message));
        }

        payload
            .product
            .map(convert_created_product)
            .ok_or_else(|| AdminShopifyError::UserError("productCreate returned no product".to_string()))
    }

    /// Delete a product. Used to roll back a create whose follow-up steps
    /// failed.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(shop = %self.shop(), product_id = %product_id))]
    pub async fn delete_product(&self, product_id: &str) -> Result<(), AdminShopifyError> {
        let variables = queries::product_delete::Variables {
            input: queries::product_delete::ProductDeleteInput {
                id: product_id.to_string(),
            },
        };

        let response = self.execute::<ProductDelete>(variables).await?;

        let payload = response.product_delete.ok_or_else(|| {
            AdminShopifyError::NotFound(format!("Product {product_id} not found"))
        })?;
        if let Some(message) = user_error_message(&payload.user_errors) {
            return Err(AdminShopifyError::UserError(message));
        }

        Ok(())
    }

    /// Update price, SKU and barcode through the REST variants endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a GID or the request fails.
    #[instrument(skip(self, update), fields(shop = %self.shop(), variant_id = %variant_id))]
    pub async fn update_variant(
        &self,
        variant_id: &str,
        update: &VariantUpdate,
    ) -> Result<(), AdminShopifyError> {
        let id = legacy_id(variant_id)
            .ok_or_else(|| AdminShopifyError::NotFound(format!("Variant {variant_id}")))?;

        let mut body = serde_json::to_value(update)?;
        body["id"] = serde_json::json!(id);

        self.rest_put(
            &format!("variants/{id}.json"),
            &serde_json::json!({ "variant": body }),
        )
        .await
    }

    /// Reserve a staged upload slot for one image.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn create_staged_upload(
        &self,
        filename: &str,
        mime_type: &str,
    ) -> Result<StagedUploadTarget, AdminShopifyError> {
        use queries::staged_uploads_create::{StagedUploadInput, Variables};

        let variables = Variables {
            input: vec![StagedUploadInput {
                filename: filename.to_string(),
                mime_type: mime_type.to_string(),
                resource: "IMAGE".to_string(),
                http_method: "POST".to_string(),
            }],
        };

        let response = self.execute::<StagedUploadsCreate>(variables).await?;

        let payload = response.staged_uploads_create.ok_or_else(|| {
            AdminShopifyError::UserError("stagedUploadsCreate returned no payload".to_string())
        })?;
        if let Some(message) = user_error_message(&payload.user_errors) {
            return Err(AdminShopifyError::UserError(message));
        }

        payload
            .staged_targets
            .into_iter()
            .next()
            .and_then(convert_staged_target)
            .ok_or_else(|| AdminShopifyError::UserError("No staged upload target".to_string()))
    }

    /// Upload image bytes to a staged target and return its resource URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the multipart POST fails.
    pub async fn upload_to_staged_target(
        &self,
        target: &StagedUploadTarget,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, AdminShopifyError> {
        let mut form = reqwest::multipart::Form::new();
        for (name, value) in &target.parameters {
            form = form.text(name.clone(), value.clone());
        }
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;
        form = form.part("file", part);

        let response = self.http().post(&target.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::Rest {
                status: status.as_u16(),
                body,
            });
        }

        Ok(target.resource_url.clone())
    }
}
