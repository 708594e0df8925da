//! End-to-end router tests.
//!
//! Each test builds the full application (state, job worker, middleware)
//! over a database pool that cannot connect, and exercises the paths that
//! are decided before any query runs.

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfwise_admin::shopify::webhook::{HMAC_HEADER, SHOP_DOMAIN_HEADER, TOPIC_HEADER};
use shelfwise_integration_tests::{
    TEST_API_SECRET, TEST_EXTENSION_ORIGIN, TestApp, session_token, shop, sign_webhook,
};

const SHOP_HEADER: &str = "x-shop-domain";

async fn send(app: &TestApp, request: Request<Body>) -> Response {
    app.router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

fn bearer(secret: &str) -> String {
    format!("Bearer {}", session_token(&shop(), secret))
}

fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(SHOP_HEADER, shop().as_str())
        .header(header::AUTHORIZATION, bearer(TEST_API_SECRET))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

#[tokio::test]
async fn liveness_is_ok() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        Request::get("/health").body(Body::empty()).expect("valid request"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), 1024).await.expect("body reads");
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn readiness_reports_unreachable_database() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        Request::get("/health/ready").body(Body::empty()).expect("valid request"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn wishlist_api_requires_shop() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        Request::get("/api/wishlist/suggested").body(Body::empty()).expect("valid request"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing shop domain");
}

#[tokio::test]
async fn wishlist_api_rejects_foreign_shop_domain() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        Request::get("/api/wishlist/suggested")
            .header(SHOP_HEADER, "evil.example.com")
            .body(Body::empty())
            .expect("valid request"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some_and(|e| e.starts_with("invalid shop domain")));
}

#[tokio::test]
async fn merchant_api_requires_session_token() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    // A shop header alone is not enough to act on a shop.
    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/products/psa")
            .header(SHOP_HEADER, shop().as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "certNumber": "87654321", "price": "249.99" }).to_string(),
            ))
            .expect("valid request"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "missing session token");
}

#[tokio::test]
async fn merchant_api_rejects_forged_session_token() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        Request::get("/api/notifications")
            .header(header::AUTHORIZATION, bearer("not-the-app-secret"))
            .body(Body::empty())
            .expect("valid request"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some_and(|e| e.starts_with("invalid session token")));
}

#[tokio::test]
async fn wishlist_requires_customer_id() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(&app, json_post("/api/wishlist", &json!({ "intent": "get" }))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing id");
}

#[tokio::test]
async fn wishlist_rejects_unknown_intent() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/wishlist?shop={}", shop()))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "id": "cust-1", "intent": "share" }).to_string()))
        .expect("valid request");
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "unknown intent: share");
}

#[tokio::test]
async fn wishlist_requires_intent() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(&app, json_post("/api/wishlist", &json!({ "id": "cust-1" }))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "missing intent");
}

#[tokio::test]
async fn malformed_json_is_a_json_error() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/products")
        .header(header::AUTHORIZATION, bearer(TEST_API_SECRET))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .expect("valid request");
    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn wishlist_preflight_allows_extension_origin_only() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/wishlist")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-shop-domain")
            .body(Body::empty())
            .expect("valid request")
    };

    let allowed = send(&app, preflight(TEST_EXTENSION_ORIGIN)).await;
    assert_eq!(
        allowed
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .expect("origin allowed"),
        TEST_EXTENSION_ORIGIN
    );

    let denied = send(&app, preflight("https://attacker.test")).await;
    assert!(denied.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

fn webhook(body: &'static [u8], signature: Option<&str>, shop_domain: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/webhooks/inventory")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SHOP_DOMAIN_HEADER, shop_domain)
        .header(TOPIC_HEADER, "inventory_levels/update");
    if let Some(signature) = signature {
        builder = builder.header(HMAC_HEADER, signature);
    }
    builder.body(Body::from(body)).expect("valid request")
}

const WEBHOOK_BODY: &[u8] = br#"{"inventory_item_id":271878346596884015,"location_id":24826418,"available":0}"#;

#[tokio::test]
async fn webhook_without_signature_is_unauthorized() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(&app, webhook(WEBHOOK_BODY, None, shop().as_str())).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn webhook_signed_with_wrong_secret_is_unauthorized() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let signature = sign_webhook(WEBHOOK_BODY, "some-other-secret");
    let response = send(&app, webhook(WEBHOOK_BODY, Some(&signature), shop().as_str())).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn signed_webhook_from_invalid_shop_is_bad_request() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let signature = sign_webhook(WEBHOOK_BODY, TEST_API_SECRET);
    let response = send(&app, webhook(WEBHOOK_BODY, Some(&signature), "not-a-shop.test")).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_webhook_queues_compliance_check() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let signature = sign_webhook(WEBHOOK_BODY, TEST_API_SECRET);
    let response = send(&app, webhook(WEBHOOK_BODY, Some(&signature), shop().as_str())).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "queued": 1 }));
}

#[tokio::test]
async fn psa_import_validates_cert_number() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        json_post("/api/products/psa", &json!({ "certNumber": "12AB", "price": "10.00" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn psa_import_rejects_negative_price() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        json_post("/api/products/psa", &json!({ "certNumber": "87654321", "price": "-1" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "price must not be negative");
}

#[tokio::test]
async fn psa_import_is_queued() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        json_post("/api/products/psa", &json!({ "certNumber": "87654321", "price": "249.99" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await, json!({ "queued": 1 }));
}

#[tokio::test]
async fn import_rejects_non_http_url() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        json_post("/api/products/import", &json!({ "url": "javascript:alert(1)" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collection_import_queues_one_job_per_product() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/sealed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/products/booster-box">Box</a>
               <a href="/products/etb">ETB</a>
               <a href="/products/booster-box">Box again</a>"#,
        ))
        .mount(&server)
        .await;
    let app = TestApp::new(&server.uri());

    let response = send(
        &app,
        json_post(
            "/api/products/import-collection",
            &json!({ "url": "/collections/sealed" }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await, json!({ "queued": 2 }));
}

#[tokio::test]
async fn jobs_are_refused_after_shutdown() {
    let server = MockServer::start().await;
    let app = TestApp::new(&server.uri());
    let TestApp { router, jobs, .. } = app;
    jobs.shutdown().await;

    let response = router
        .oneshot(json_post(
            "/api/products/psa",
            &json!({ "certNumber": "87654321", "price": "5" }),
        ))
        .await
        .expect("router is infallible");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
