//! Integration tests for Shelfwise.
//!
//! Every external service (Shopify, the retailer storefront, the PSA
//! browser service) is stood up with `wiremock`, so the suite makes no real
//! network calls.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shelfwise-integration-tests
//! ```
//!
//! Router tests build the full application over a lazily connected pool.
//! Requests that are rejected before touching the database (auth, shop and
//! body validation) need no `PostgreSQL`; the readiness check is expected to
//! report 503.
//!
//! Repository, compliance and product-creation tests use `#[sqlx::test]`,
//! which creates a fresh database per test from `DATABASE_URL` and applies
//! the admin migrations:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/postgres cargo test -p shelfwise-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::Router;
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::SecretString;
use sha2::Sha256;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use shelfwise_admin::{
    config::{
        AppConfig, AutomationConfig, EmailConfig, JobConfig, PsaBrowserConfig, ScraperConfig,
        ShopifyAppConfig,
    },
    db::SessionRepository,
    jobs::JobQueueHandle,
    models::ShopSession,
    services::SessionResolver,
    shopify::AdminClient,
    state::AppState,
};
use shelfwise_core::ShopDomain;

/// App API key used by test configurations.
pub const TEST_API_KEY: &str = "test-api-key";

/// Webhook signing secret used by test configurations.
pub const TEST_API_SECRET: &str = "shpss_test_signing_key";

/// Admin API version used by test clients.
pub const TEST_API_VERSION: &str = "2025-01";

/// Origin allowed to call the wishlist API in test configurations.
pub const TEST_EXTENSION_ORIGIN: &str = "https://extensions.shopifycdn.com";

/// The shop every test runs against.
#[must_use]
pub fn shop() -> ShopDomain {
    ShopDomain::parse("cards-r-us.myshopify.com").expect("valid shop domain")
}

/// Scraper settings pointed at a mock server, with fast retries.
#[must_use]
pub fn scraper_config(base_url: &str) -> ScraperConfig {
    ScraperConfig {
        retailer_base_url: Some(base_url.to_string()),
        timeout: Duration::from_secs(5),
        max_retries: 2,
        backoff_base_secs: 0,
        psa: Some(PsaBrowserConfig {
            endpoint: base_url.to_string(),
            token: SecretString::from("browser-token"),
            bypass_cookie: Some(SecretString::from("cf_clearance=abc123")),
        }),
    }
}

/// Offline access token stored for [`shop`].
pub const TEST_ACCESS_TOKEN: &str = "shpat_test_token";

/// Store an offline session for [`shop`].
pub async fn install_shop(pool: &PgPool) {
    SessionRepository::new(pool)
        .save(&ShopSession {
            shop: shop(),
            access_token: SecretString::from(TEST_ACCESS_TOKEN),
            scope: "read_products,write_products,write_inventory".to_string(),
            expires_at: None,
        })
        .await
        .expect("session saved");
}

/// Session resolver whose clients talk to `base_url`.
#[must_use]
pub fn session_resolver(pool: PgPool, base_url: &str) -> SessionResolver {
    SessionResolver::new(pool, reqwest::Client::new(), &app_config(base_url).shopify)
}

/// Admin client for [`shop`] that talks to a mock server.
#[must_use]
pub fn admin_client(base_url: &str) -> AdminClient {
    AdminClient::with_base_url(
        reqwest::Client::new(),
        &shop(),
        base_url,
        TEST_API_VERSION,
        SecretString::from(TEST_ACCESS_TOKEN),
    )
}

/// Configuration with every optional integration pointed at `base_url`.
#[must_use]
pub fn app_config(base_url: &str) -> AppConfig {
    AppConfig {
        database_url: SecretString::from("postgres://shelfwise@127.0.0.1:1/shelfwise_test"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        shopify: ShopifyAppConfig {
            api_key: TEST_API_KEY.to_string(),
            api_secret: SecretString::from(TEST_API_SECRET),
            api_version: TEST_API_VERSION.to_string(),
            admin_base_url: Some(base_url.to_string()),
        },
        email: EmailConfig {
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: 2525,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("smtp-test-credential"),
            from_address: "Shelfwise <restock@cards-r-us.test>".to_string(),
        },
        extension_origin: Some(TEST_EXTENSION_ORIGIN.to_string()),
        automation: AutomationConfig::default(),
        scraper: scraper_config(base_url),
        jobs: JobConfig {
            max_retries: 0,
            ..JobConfig::default()
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// A running application: the router plus the job worker it feeds.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Held so the worker keeps running for the duration of the test.
    pub jobs: JobQueueHandle,
}

impl TestApp {
    /// Build the full application over a pool that never connects
    /// successfully. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let config = app_config(base_url);
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(250))
            .connect_lazy("postgres://shelfwise@127.0.0.1:1/shelfwise_test")
            .expect("valid database url");

        let (state, jobs) = AppState::from_config(config, pool).expect("state wires up");
        let router = shelfwise_admin::app(state.clone());

        Self {
            router,
            state,
            jobs,
        }
    }
}

/// Sign a webhook body the way Shopify does.
#[must_use]
pub fn sign_webhook(body: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("any key length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Mint a session token for `shop` the way the embedded admin app does.
#[must_use]
pub fn session_token(shop: &ShopDomain, secret: &str) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs();
    let claims = serde_json::json!({
        "iss": format!("https://{shop}/admin"),
        "dest": format!("https://{shop}"),
        "aud": TEST_API_KEY,
        "sub": "1",
        "exp": now + 60,
        "nbf": now,
        "iat": now,
        "jti": "session-1",
        "sid": "sid-1",
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("token encodes")
}
