//! Shopify Admin API client bound to a single shop.
//!
//! GraphQL operations go through [`AdminClient::execute`]; the two REST
//! endpoints (variants and inventory items) go through
//! [`AdminClient::rest_put`].

use std::sync::Arc;

use graphql_client::GraphQLQuery;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use shelfwise_core::ShopDomain;

use super::{AdminShopifyError, GraphQLError};

mod conversions;
mod inventory;
mod products;
pub mod queries;
mod webhooks;

/// Shopify Admin API client.
///
/// Cheap to clone; the HTTP connection pool is shared.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    shop: ShopDomain,
    /// `https://<shop>` in production, a mock server in tests.
    base_url: String,
    api_version: String,
    access_token: SecretString,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("shop", &self.inner.shop)
            .field("base_url", &self.inner.base_url)
            .field("api_version", &self.inner.api_version)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLErrorResponse>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorResponse {
    message: String,
    #[serde(default)]
    path: Vec<serde_json::Value>,
}

impl AdminClient {
    /// Create a client for `shop` using its offline access token.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        shop: &ShopDomain,
        api_version: &str,
        access_token: SecretString,
    ) -> Self {
        Self::with_base_url(
            client,
            shop,
            &format!("https://{shop}"),
            api_version,
            access_token,
        )
    }

    /// Create a client that talks to `base_url` instead of the shop host.
    #[must_use]
    pub fn with_base_url(
        client: reqwest::Client,
        shop: &ShopDomain,
        base_url: &str,
        api_version: &str,
        access_token: SecretString,
    ) -> Self {
        Self {
            inner: Arc::new(AdminClientInner {
                client,
                shop: shop.clone(),
                base_url: base_url.trim_end_matches('/').to_string(),
                api_version: api_version.to_string(),
                access_token,
            }),
        }
    }

    /// The shop this client is bound to.
    #[must_use]
    pub fn shop(&self) -> &ShopDomain {
        &self.inner.shop
    }

    /// The underlying HTTP client (shared with staged uploads).
    #[must_use]
    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/admin/api/{}/{}",
            self.inner.base_url, self.inner.api_version, path
        )
    }

    /// Map the status codes Shopify uses for throttling and auth failures.
    fn check_status(response: &reqwest::Response) -> Result<(), AdminShopifyError> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<f64>().ok())
                .map_or(2, |secs| secs.ceil().max(0.0) as u64);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or expired access token".to_string(),
            ));
        }

        Ok(())
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError>
    where
        Q::ResponseData: DeserializeOwned,
    {
        let body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(self.api_url("graphql.json"))
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        Self::check_status(&response)?;

        let graphql_response: GraphQLResponse<Q::ResponseData> = response.json().await?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            return Err(AdminShopifyError::GraphQL(
                errors
                    .into_iter()
                    .map(|e| GraphQLError {
                        message: e.message,
                        path: e.path,
                    })
                    .collect(),
            ));
        }

        graphql_response.data.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                path: vec![],
            }])
        })
    }

    // =========================================================================
    // REST Execution
    // =========================================================================

    /// PUT a JSON body to a REST resource, discarding the response body.
    async fn rest_put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), AdminShopifyError> {
        let response = self
            .inner
            .client
            .put(self.api_url(path))
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .json(body)
            .send()
            .await?;

        Self::check_status(&response)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(AdminShopifyError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdminShopifyError::Rest {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
