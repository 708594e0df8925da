//! GraphQL operation definitions for Shopify Admin API.
//!
//! Each operation is a unit struct implementing `graphql_client::GraphQLQuery`
//! with its query text inline, plus a module holding its `Variables` and
//! `ResponseData` types. The layout mirrors what `graphql_client` codegen
//! produces, without needing the multi-megabyte Admin schema in the repo.

use graphql_client::{GraphQLQuery, QueryBody};

/// Declare an operation struct bound to a query module.
macro_rules! admin_operation {
    ($name:ident, $module:ident) => {
        pub struct $name;

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: $module::QUERY,
                    operation_name: $module::OPERATION_NAME,
                }
            }
        }
    };
}

/// `userErrors` entry shared by every mutation payload.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Join mutation user errors into one message, or `None` when empty.
pub fn user_error_message(errors: &[UserError]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|e| match &e.field {
                Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
                _ => e.message.clone(),
            })
            .collect::<Vec<_>>()
            .join("; "),
    )
}

// =============================================================================
// Catalog queries
// =============================================================================

admin_operation!(GetProductsWithInventory, get_products_with_inventory);

pub mod get_products_with_inventory {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "GetProductsWithInventory";
    pub const QUERY: &str = r#"
query GetProductsWithInventory($first: Int!, $after: String, $locationId: ID!) {
  products(first: $first, after: $after, sortKey: ID) {
    pageInfo { hasNextPage endCursor }
    nodes {
      id
      title
      handle
      status
      tags
      onlineStoreUrl
      variants(first: 100) {
        nodes {
          id
          title
          sku
          inventoryItem {
            id
            inventoryLevel(locationId: $locationId) {
              quantities(names: ["available"]) { name quantity }
            }
          }
        }
      }
    }
  }
}
"#;

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub first: i64,
        pub after: Option<String>,
        pub location_id: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub products: Products,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Products {
        pub page_info: PageInfo,
        pub nodes: Vec<Product>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PageInfo {
        pub has_next_page: bool,
        pub end_cursor: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Product {
        pub id: String,
        pub title: String,
        pub handle: String,
        pub status: String,
        #[serde(default)]
        pub tags: Vec<String>,
        pub online_store_url: Option<String>,
        pub variants: Variants,
    }

    #[derive(Debug, Deserialize)]
    pub struct Variants {
        pub nodes: Vec<Variant>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variant {
        pub id: String,
        pub title: String,
        pub sku: Option<String>,
        pub inventory_item: Option<InventoryItem>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InventoryItem {
        pub id: String,
        pub inventory_level: Option<InventoryLevel>,
    }

    #[derive(Debug, Deserialize)]
    pub struct InventoryLevel {
        pub quantities: Vec<Quantity>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Quantity {
        pub name: String,
        pub quantity: i64,
    }
}

admin_operation!(SearchProducts, search_products);

pub mod search_products {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "SearchProducts";
    pub const QUERY: &str = r#"
query SearchProducts($first: Int!, $query: String!) {
  products(first: $first, query: $query) {
    nodes { id title status }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub first: i64,
        pub query: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub products: Products,
    }

    #[derive(Debug, Deserialize)]
    pub struct Products {
        pub nodes: Vec<Product>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Product {
        pub id: String,
        pub title: String,
        pub status: String,
    }
}

admin_operation!(GetLocations, get_locations);

pub mod get_locations {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "GetLocations";
    pub const QUERY: &str = r#"
query GetLocations($first: Int!) {
  locations(first: $first) {
    nodes { id name isActive }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub first: i64,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub locations: Locations,
    }

    #[derive(Debug, Deserialize)]
    pub struct Locations {
        pub nodes: Vec<Location>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Location {
        pub id: String,
        pub name: String,
        pub is_active: bool,
    }
}

admin_operation!(GetWebhookSubscriptions, get_webhook_subscriptions);

pub mod get_webhook_subscriptions {
    use serde::{Deserialize, Serialize};

    pub const OPERATION_NAME: &str = "GetWebhookSubscriptions";
    pub const QUERY: &str = r#"
query GetWebhookSubscriptions($first: Int!) {
  webhookSubscriptions(first: $first) {
    nodes {
      id
      topic
      format
      createdAt
      endpoint {
        __typename
        ... on WebhookHttpEndpoint { callbackUrl }
      }
    }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub first: i64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub webhook_subscriptions: Subscriptions,
    }

    #[derive(Debug, Deserialize)]
    pub struct Subscriptions {
        pub nodes: Vec<Subscription>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Subscription {
        pub id: String,
        pub topic: String,
        pub format: String,
        pub created_at: String,
        pub endpoint: Option<Endpoint>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Endpoint {
        #[serde(default)]
        pub callback_url: Option<String>,
    }
}

// =============================================================================
// Mutations
// =============================================================================

admin_operation!(ProductUpdateStatus, product_update_status);

pub mod product_update_status {
    use serde::{Deserialize, Serialize};

    use super::UserError;

    pub const OPERATION_NAME: &str = "ProductUpdateStatus";
    pub const QUERY: &str = r#"
mutation ProductUpdateStatus($product: ProductUpdateInput!) {
  productUpdate(product: $product) {
    product { id status }
    userErrors { field message }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub product: ProductUpdateInput,
    }

    #[derive(Debug, Serialize)]
    pub struct ProductUpdateInput {
        pub id: String,
        pub status: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_update: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub product: Option<Product>,
        pub user_errors: Vec<UserError>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Product {
        pub id: String,
        pub status: String,
    }
}

admin_operation!(ProductCreate, product_create);

pub mod product_create {
    use serde::{Deserialize, Serialize};

    use super::UserError;

    pub const OPERATION_NAME: &str = "ProductCreate";
    pub const QUERY: &str = r#"
mutation ProductCreate($product: ProductCreateInput!, $media: [CreateMediaInput!]) {
  productCreate(product: $product, media: $media) {
    product {
      id
      handle
      title
      variants(first: 1) {
        nodes { id inventoryItem { id } }
      }
    }
    userErrors { field message }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub product: ProductCreateInput,
        pub media: Vec<CreateMediaInput>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProductCreateInput {
        pub title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub description_html: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub vendor: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub product_type: Option<String>,
        pub tags: Vec<String>,
        pub status: String,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct CreateMediaInput {
        pub original_source: String,
        pub media_content_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub alt: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_create: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub product: Option<Product>,
        pub user_errors: Vec<UserError>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Product {
        pub id: String,
        pub handle: String,
        pub title: String,
        pub variants: Variants,
    }

    #[derive(Debug, Deserialize)]
    pub struct Variants {
        pub nodes: Vec<Variant>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variant {
        pub id: String,
        pub inventory_item: Option<InventoryItem>,
    }

    #[derive(Debug, Deserialize)]
    pub struct InventoryItem {
        pub id: String,
    }
}

admin_operation!(ProductDelete, product_delete);

pub mod product_delete {
    use serde::{Deserialize, Serialize};

    use super::UserError;

    pub const OPERATION_NAME: &str = "ProductDelete";
    pub const QUERY: &str = r#"
mutation ProductDelete($input: ProductDeleteInput!) {
  productDelete(input: $input) {
    deletedProductId
    userErrors { field message }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: ProductDeleteInput,
    }

    #[derive(Debug, Serialize)]
    pub struct ProductDeleteInput {
        pub id: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub product_delete: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub deleted_product_id: Option<String>,
        pub user_errors: Vec<UserError>,
    }
}

admin_operation!(InventorySetQuantities, inventory_set_quantities);

pub mod inventory_set_quantities {
    use serde::{Deserialize, Serialize};

    use super::UserError;

    pub const OPERATION_NAME: &str = "InventorySetQuantities";
    pub const QUERY: &str = r#"
mutation InventorySetQuantities($input: InventorySetQuantitiesInput!) {
  inventorySetQuantities(input: $input) {
    inventoryAdjustmentGroup { id }
    userErrors { field message }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: InventorySetQuantitiesInput,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InventorySetQuantitiesInput {
        pub name: String,
        pub reason: String,
        pub ignore_compare_quantity: bool,
        pub quantities: Vec<InventoryQuantityInput>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct InventoryQuantityInput {
        pub inventory_item_id: String,
        pub location_id: String,
        pub quantity: i64,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub inventory_set_quantities: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub user_errors: Vec<UserError>,
    }
}

admin_operation!(StagedUploadsCreate, staged_uploads_create);

pub mod staged_uploads_create {
    use serde::{Deserialize, Serialize};

    use super::UserError;

    pub const OPERATION_NAME: &str = "StagedUploadsCreate";
    pub const QUERY: &str = r#"
mutation StagedUploadsCreate($input: [StagedUploadInput!]!) {
  stagedUploadsCreate(input: $input) {
    stagedTargets {
      url
      resourceUrl
      parameters { name value }
    }
    userErrors { field message }
  }
}
"#;

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub input: Vec<StagedUploadInput>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct StagedUploadInput {
        pub filename: String,
        pub mime_type: String,
        pub resource: String,
        pub http_method: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub staged_uploads_create: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        #[serde(default)]
        pub staged_targets: Vec<StagedTarget>,
        pub user_errors: Vec<UserError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct StagedTarget {
        pub url: Option<String>,
        pub resource_url: Option<String>,
        #[serde(default)]
        pub parameters: Vec<Parameter>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Parameter {
        pub name: String,
        pub value: String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_uses_operation_name() {
        let body = GetLocations::build_query(get_locations::Variables { first: 5 });
        assert_eq!(body.operation_name, "GetLocations");
        assert!(body.query.contains("locations(first: $first)"));

        let json = serde_json::to_value(&body).unwrap_or_default();
        assert_eq!(json["variables"]["first"], 5);
        assert_eq!(json["operationName"], "GetLocations");
    }

    #[test]
    fn test_variables_are_camel_case() {
        let vars = get_products_with_inventory::Variables {
            first: 50,
            after: None,
            location_id: "gid://shopify/Location/1".to_string(),
        };
        let json = serde_json::to_value(&vars).unwrap_or_default();
        assert_eq!(json["locationId"], "gid://shopify/Location/1");
    }

    #[test]
    fn test_user_error_message() {
        assert_eq!(user_error_message(&[]), None);
        let errors = vec![
            UserError {
                field: Some(vec!["product".to_string(), "title".to_string()]),
                message: "can't be blank".to_string(),
            },
            UserError {
                field: None,
                message: "Media is invalid".to_string(),
            },
        ];
        assert_eq!(
            user_error_message(&errors).as_deref(),
            Some("product.title: can't be blank; Media is invalid")
        );
    }
}
