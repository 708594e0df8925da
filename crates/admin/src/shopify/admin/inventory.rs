//! Location and inventory operations for the Admin API.

use tracing::instrument;

use super::{
    AdminClient, AdminShopifyError,
    conversions::convert_locations,
    queries::{self, GetLocations, InventorySetQuantities, user_error_message},
};
use crate::shopify::types::{InventoryItemUpdate, Location, legacy_id};

impl AdminClient {
    /// Get the shop's locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn get_locations(&self) -> Result<Vec<Location>, AdminShopifyError> {
        let variables = queries::get_locations::Variables { first: 25 };

        let response = self.execute::<GetLocations>(variables).await?;

        Ok(convert_locations(response.locations))
    }

    /// The first active location, which automation treats as the shop's
    /// inventory source.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NotFound` if the shop has no active
    /// location.
    pub async fn get_primary_location(&self) -> Result<Location, AdminShopifyError> {
        self.get_locations()
            .await?
            .into_iter()
            .find(|l| l.is_active)
            .ok_or_else(|| AdminShopifyError::NotFound("No active location".to_string()))
    }

    /// Set the available quantity of an item at a location.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or returns user errors.
    #[instrument(skip(self), fields(shop = %self.shop(), inventory_item_id = %inventory_item_id, quantity = %quantity))]
    pub async fn set_inventory_quantity(
        &self,
        inventory_item_id: &str,
        location_id: &str,
        quantity: i64,
    ) -> Result<(), AdminShopifyError> {
        use queries::inventory_set_quantities::{
            InventoryQuantityInput, InventorySetQuantitiesInput, Variables,
        };

        let variables = Variables {
            input: InventorySetQuantitiesInput {
                name: "available".to_string(),
                reason: "correction".to_string(),
                ignore_compare_quantity: true,
                quantities: vec![InventoryQuantityInput {
                    inventory_item_id: inventory_item_id.to_string(),
                    location_id: location_id.to_string(),
                    quantity,
                }],
            },
        };

        let response = self.execute::<InventorySetQuantities>(variables).await?;

        if let Some(payload) = response.inventory_set_quantities
            && let Some(message) = user_error_message(&payload.user_errors)
        {
            return Err(AdminShopifyError::UserError(message));
        }

        Ok(())
    }

    /// Update cost and tracking through the REST inventory items endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not a GID or the request fails.
    #[instrument(skip(self, update), fields(shop = %self.shop(), inventory_item_id = %inventory_item_id))]
    pub async fn update_inventory_item(
        &self,
        inventory_item_id: &str,
        update: &InventoryItemUpdate,
    ) -> Result<(), AdminShopifyError> {
        let id = legacy_id(inventory_item_id).ok_or_else(|| {
            AdminShopifyError::NotFound(format!("Inventory item {inventory_item_id}"))
        })?;

        let mut body = serde_json::to_value(update)?;
        body["id"] = serde_json::json!(id);

        self.rest_put(
            &format!("inventory_items/{id}.json"),
            &serde_json::json!({ "inventory_item": body }),
        )
        .await
    }
}
