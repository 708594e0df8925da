//! Webhook subscription listing (diagnostics).

use tracing::instrument;

use super::{
    AdminClient, AdminShopifyError,
    conversions::convert_webhook_subscriptions,
    queries::{self, GetWebhookSubscriptions},
};
use crate::shopify::types::WebhookSubscription;

impl AdminClient {
    /// List the app's webhook subscriptions on this shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(shop = %self.shop()))]
    pub async fn list_webhook_subscriptions(
        &self,
    ) -> Result<Vec<WebhookSubscription>, AdminShopifyError> {
        let variables = queries::get_webhook_subscriptions::Variables { first: 50 };

        let response = self.execute::<GetWebhookSubscriptions>(variables).await?;

        Ok(convert_webhook_subscriptions(response.webhook_subscriptions))
    }
}
