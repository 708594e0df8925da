//! Compliance runs end to end: a mock shop, a real database and a stub
//! mail transport.

use serde_json::{Value, json};
use sqlx::PgPool;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use chrono::{TimeDelta, Utc};
use shelfwise_admin::config::AutomationConfig;
use shelfwise_admin::db::{EmailSentRepository, WishlistRepository};
use shelfwise_admin::services::{ComplianceService, EmailService};
use shelfwise_core::{Email, Keyword};
use shelfwise_integration_tests::{TEST_API_VERSION, install_shop, session_resolver, shop};

const SENDER: &str = "Shelfwise <restock@cards-r-us.test>";

fn graphql_path() -> String {
    format!("/admin/api/{TEST_API_VERSION}/graphql.json")
}

fn catalog_product(id: u64, status: &str, available: &[i64]) -> Value {
    json!({
        "id": format!("gid://shopify/Product/{id}"),
        "title": format!("Booster Box {id}"),
        "handle": format!("booster-box-{id}"),
        "status": status,
        "tags": [],
        "onlineStoreUrl": null,
        "variants": {
            "nodes": available.iter().enumerate().map(|(i, qty)| json!({
                "id": format!("gid://shopify/ProductVariant/{id}{i}"),
                "title": "Default Title",
                "sku": "",
                "inventoryItem": {
                    "id": format!("gid://shopify/InventoryItem/{id}{i}"),
                    "inventoryLevel": {
                        "quantities": [{ "name": "available", "quantity": qty }]
                    }
                }
            })).collect::<Vec<_>>()
        }
    })
}

async fn mount_location(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(graphql_path()))
        .and(body_partial_json(json!({ "operationName": "GetLocations" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "locations": { "nodes": [
                { "id": "gid://shopify/Location/1", "name": "Shop", "isActive": true }
            ] } }
        })))
        .mount(server)
        .await;
}

/// Serve `products` as the whole catalog for the next `runs` reads.
async fn mount_catalog(server: &MockServer, products: Vec<Value>, runs: u64) {
    Mock::given(method("POST"))
        .and(path(graphql_path()))
        .and(body_partial_json(json!({ "operationName": "GetProductsWithInventory" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "products": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": products
            } }
        })))
        .up_to_n_times(runs)
        .mount(server)
        .await;
}

fn status_update(product_id: u64, status: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(graphql_path()))
        .and(body_partial_json(json!({
            "operationName": "ProductUpdateStatus",
            "variables": { "product": {
                "id": format!("gid://shopify/Product/{product_id}"),
                "status": status
            } }
        })))
}

fn updated() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "data": { "productUpdate": { "product": { "id": "x", "status": "x" }, "userErrors": [] } }
    }))
}

fn service(pool: &PgPool, base_url: &str, email: EmailService) -> ComplianceService {
    ComplianceService::new(
        session_resolver(pool.clone(), base_url),
        email,
        AutomationConfig::default(),
    )
}

async fn subscribe(pool: &PgPool, keyword: &str, email: &str) {
    let repo = WishlistRepository::new(pool);
    let wishlist = repo.get_or_create(&shop(), "cust_1").await.expect("wishlist");
    repo.add_keyword(wishlist.id, &Keyword::parse(keyword).expect("valid keyword"))
        .await
        .expect("keyword added");
    repo.set_email(wishlist.id, Some(&Email::parse(email).expect("valid email")))
        .await
        .expect("email set");
}

async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT count(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count")
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn product_at_zero_is_drafted_once_across_runs(pool: PgPool) {
    install_shop(&pool).await;
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_catalog(&server, vec![catalog_product(1, "ACTIVE", &[0])], 1).await;
    mount_catalog(&server, vec![catalog_product(1, "DRAFT", &[0])], 3).await;
    status_update(1, "DRAFT")
        .respond_with(updated())
        .expect(1)
        .mount(&server)
        .await;

    let compliance = service(&pool, &server.uri(), EmailService::stub(SENDER));

    let first = compliance.check_shop(&shop()).await.expect("run completes");
    assert_eq!(first.drafted, 1);

    for _ in 0..3 {
        let report = compliance.check_shop(&shop()).await.expect("run completes");
        assert_eq!(report.drafted, 0);
        assert_eq!(report.failures, 0);
    }
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn one_failing_product_does_not_stop_the_run(pool: PgPool) {
    install_shop(&pool).await;
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_catalog(
        &server,
        vec![
            catalog_product(1, "ACTIVE", &[0]),
            catalog_product(2, "ACTIVE", &[0]),
        ],
        1,
    )
    .await;
    status_update(1, "DRAFT")
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "productUpdate": {
                "product": null,
                "userErrors": [{ "field": ["status"], "message": "Product is locked" }]
            } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    status_update(2, "DRAFT")
        .respond_with(updated())
        .expect(1)
        .mount(&server)
        .await;

    let report = service(&pool, &server.uri(), EmailService::stub(SENDER))
        .check_shop(&shop())
        .await
        .expect("run completes");

    assert_eq!(report.checked, 2);
    assert_eq!(report.drafted, 1);
    assert_eq!(report.failures, 1);
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn restock_email_is_not_resent_inside_the_cooldown(pool: PgPool) {
    install_shop(&pool).await;
    subscribe(&pool, "booster", "fan@example.com").await;
    let server = MockServer::start().await;
    mount_location(&server).await;
    // Restocked, sold out again, restocked again: all inside a day.
    mount_catalog(&server, vec![catalog_product(1, "DRAFT", &[4])], 1).await;
    mount_catalog(&server, vec![catalog_product(1, "ACTIVE", &[0])], 1).await;
    mount_catalog(&server, vec![catalog_product(1, "DRAFT", &[2])], 1).await;
    status_update(1, "ACTIVE")
        .respond_with(updated())
        .expect(2)
        .mount(&server)
        .await;
    status_update(1, "DRAFT")
        .respond_with(updated())
        .expect(1)
        .mount(&server)
        .await;

    let compliance = service(&pool, &server.uri(), EmailService::stub(SENDER));

    let first = compliance.check_shop(&shop()).await.expect("run completes");
    assert_eq!((first.activated, first.emails_sent), (1, 1));

    let second = compliance.check_shop(&shop()).await.expect("run completes");
    assert_eq!((second.drafted, second.emails_sent), (1, 0));

    let third = compliance.check_shop(&shop()).await.expect("run completes");
    assert_eq!((third.activated, third.emails_sent), (1, 0));

    assert_eq!(count(&pool, "email_sent").await, 1);
    assert_eq!(count(&pool, "restock_pending").await, 0);
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn failed_restock_email_is_retried_on_the_next_run(pool: PgPool) {
    install_shop(&pool).await;
    subscribe(&pool, "booster", "fan@example.com").await;
    let server = MockServer::start().await;
    mount_location(&server).await;
    mount_catalog(&server, vec![catalog_product(1, "DRAFT", &[4])], 1).await;
    mount_catalog(&server, vec![catalog_product(1, "ACTIVE", &[4])], 1).await;
    status_update(1, "ACTIVE")
        .respond_with(updated())
        .expect(1)
        .mount(&server)
        .await;

    let failed = service(&pool, &server.uri(), EmailService::rejecting_stub(SENDER))
        .check_shop(&shop())
        .await
        .expect("run completes");
    assert_eq!((failed.activated, failed.emails_sent, failed.failures), (1, 0, 1));
    assert_eq!(count(&pool, "restock_pending").await, 1);
    assert_eq!(count(&pool, "email_sent").await, 0, "failed send releases its claim");

    // The product is already Active, so only the marker brings the email back.
    let retried = service(&pool, &server.uri(), EmailService::stub(SENDER))
        .check_shop(&shop())
        .await
        .expect("run completes");
    assert_eq!((retried.activated, retried.emails_sent, retried.failures), (0, 1, 0));
    assert_eq!(count(&pool, "restock_pending").await, 0);
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn concurrent_claims_let_exactly_one_send(pool: PgPool) {
    let log = EmailSentRepository::new(&pool);
    let now = Utc::now();
    let cutoff = now - TimeDelta::hours(24);

    let (shop_a, shop_b) = (shop(), shop());
    let (a, b) = tokio::join!(
        log.claim(&shop_a, "gid://shopify/Product/1", now, cutoff),
        log.claim(&shop_b, "gid://shopify/Product/1", now, cutoff),
    );
    let won = [a.expect("claim runs"), b.expect("claim runs")];
    assert_eq!(won.iter().filter(|c| c.is_some()).count(), 1);

    let later = now + TimeDelta::hours(1);
    assert!(
        log.claim(&shop(), "gid://shopify/Product/1", later, later - TimeDelta::hours(24))
            .await
            .expect("claim runs")
            .is_none(),
        "still inside the cooldown"
    );
}

#[sqlx::test(migrations = "../admin/migrations")]
async fn released_claim_restores_the_previous_send(pool: PgPool) {
    let log = EmailSentRepository::new(&pool);
    let product = "gid://shopify/Product/1";
    let earlier = Utc::now() - TimeDelta::hours(30);
    log.record(&shop(), product, earlier).await.expect("recorded");

    let now = Utc::now();
    let claim = log
        .claim(&shop(), product, now, now - TimeDelta::hours(24))
        .await
        .expect("claim runs")
        .expect("cooldown has passed");
    let restored = claim.previous.expect("a previous send");
    assert_eq!(restored.timestamp_micros(), earlier.timestamp_micros());

    log.release(&shop(), product, claim).await.expect("released");
    let last = log.last_sent(&shop(), product).await.expect("read").expect("row kept");
    assert_eq!(last.timestamp_micros(), earlier.timestamp_micros());

    let fresh = log
        .claim(&shop(), "gid://shopify/Product/2", now, now - TimeDelta::hours(24))
        .await
        .expect("claim runs")
        .expect("never sent");
    assert_eq!(fresh.previous, None);
    log.release(&shop(), "gid://shopify/Product/2", fresh).await.expect("released");
    assert_eq!(log.last_sent(&shop(), "gid://shopify/Product/2").await.expect("read"), None);
}
