//! Conversions from raw GraphQL responses to domain types.

use shelfwise_core::ProductStatus;

use super::queries::{
    get_locations, get_products_with_inventory, get_webhook_subscriptions, product_create,
    search_products, staged_uploads_create,
};
use crate::shopify::types::{
    CatalogPage, CatalogProduct, CatalogVariant, CreatedProduct, Location, ProductSummary,
    StagedUploadTarget, WebhookSubscription,
};

/// Parse a GraphQL `ProductStatus`; unknown values (e.g. `UNLISTED`) are
/// treated as draft so automation never activates them.
fn convert_status(raw: &str) -> ProductStatus {
    raw.parse().unwrap_or(ProductStatus::Draft)
}

pub fn convert_catalog_page(products: get_products_with_inventory::Products) -> CatalogPage {
    CatalogPage {
        products: products
            .nodes
            .into_iter()
            .map(convert_catalog_product)
            .collect(),
        has_next_page: products.page_info.has_next_page,
        end_cursor: products.page_info.end_cursor,
    }
}

fn convert_catalog_product(product: get_products_with_inventory::Product) -> CatalogProduct {
    CatalogProduct {
        status: convert_status(&product.status),
        id: product.id,
        title: product.title,
        handle: product.handle,
        tags: product.tags,
        online_store_url: product.online_store_url,
        variants: product
            .variants
            .nodes
            .into_iter()
            .map(convert_catalog_variant)
            .collect(),
    }
}

fn convert_catalog_variant(variant: get_products_with_inventory::Variant) -> CatalogVariant {
    let (inventory_item_id, available) = match variant.inventory_item {
        Some(item) => {
            let available = item
                .inventory_level
                .and_then(|level| {
                    level
                        .quantities
                        .into_iter()
                        .find(|q| q.name == "available")
                        .map(|q| q.quantity)
                })
                .unwrap_or(0);
            (Some(item.id), available)
        }
        None => (None, 0),
    };

    CatalogVariant {
        id: variant.id,
        title: variant.title,
        sku: variant.sku.filter(|s| !s.is_empty()),
        inventory_item_id,
        available,
    }
}

pub fn convert_product_summaries(products: search_products::Products) -> Vec<ProductSummary> {
    products
        .nodes
        .into_iter()
        .map(|p| ProductSummary {
            status: convert_status(&p.status),
            id: p.id,
            title: p.title,
        })
        .collect()
}

pub fn convert_locations(locations: get_locations::Locations) -> Vec<Location> {
    locations
        .nodes
        .into_iter()
        .map(|l| Location {
            id: l.id,
            name: l.name,
            is_active: l.is_active,
        })
        .collect()
}

pub fn convert_created_product(product: product_create::Product) -> CreatedProduct {
    let first_variant = product.variants.nodes.into_iter().next();
    let (variant_id, inventory_item_id) = match first_variant {
        Some(v) => (Some(v.id), v.inventory_item.map(|i| i.id)),
        None => (None, None),
    };

    CreatedProduct {
        id: product.id,
        handle: product.handle,
        title: product.title,
        variant_id,
        inventory_item_id,
    }
}

pub fn convert_webhook_subscriptions(
    subscriptions: get_webhook_subscriptions::Subscriptions,
) -> Vec<WebhookSubscription> {
    subscriptions
        .nodes
        .into_iter()
        .map(|s| WebhookSubscription {
            id: s.id,
            topic: s.topic,
            format: s.format,
            callback_url: s.endpoint.and_then(|e| e.callback_url),
            created_at: s.created_at,
        })
        .collect()
}

pub fn convert_staged_target(
    target: staged_uploads_create::StagedTarget,
) -> Option<StagedUploadTarget> {
    Some(StagedUploadTarget {
        url: target.url?,
        resource_url: target.resource_url?,
        parameters: target
            .parameters
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect(),
    })
}
