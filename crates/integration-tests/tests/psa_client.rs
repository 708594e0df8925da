//! Integration tests for `PsaClient` against a mock browser service.

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfwise_admin::scraper::{PsaClient, ScraperError};
use shelfwise_core::CertNumber;
use shelfwise_integration_tests::scraper_config;

const CERT_PAGE: &str = r#"<html>
<head><meta property="og:image" content="https://img.psacard.test/og.jpg"></head>
<body>
  <table>
    <tr><th>Item Grade</th><td>GEM MT 10</td></tr>
    <tr><th>Year</th><td>2023</td></tr>
    <tr><th>Brand/Title</th><td>Pokemon Svp En-Sv Black Star Promo</td></tr>
    <tr><th>Subject</th><td>Pikachu</td></tr>
    <tr><th>Card Number</th><td>#085</td></tr>
  </table>
  <img alt="PSA slab front" src="https://img.psacard.test/85-front.jpg">
  <img alt="PSA slab back" src="https://img.psacard.test/85-back.jpg">
</body>
</html>"#;

fn client(server: &MockServer) -> PsaClient {
    let config = scraper_config(&server.uri());
    let browser = config.psa.as_ref().expect("test config enables PSA");
    PsaClient::new(browser, &config).expect("client builds")
}

fn cert() -> CertNumber {
    CertNumber::parse("87654321").expect("valid cert")
}

#[tokio::test]
async fn lookup_renders_cert_page_through_browser_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/content"))
        .and(query_param("token", "browser-token"))
        .and(body_partial_json(json!({
            "url": "https://www.psacard.com/cert/87654321/psa",
            "cookies": [{ "name": "cf_clearance", "value": "abc123", "domain": ".psacard.com" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(CERT_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let card = client(&server).lookup(&cert()).await.expect("cert parses");

    assert_eq!(card.grade, "GEM MT 10");
    assert_eq!(card.subject, "Pikachu");
    assert_eq!(card.card_number.as_deref(), Some("085"));
    assert_eq!(
        card.product_title(),
        "2023 Pokemon Svp En-Sv Black Star Promo Pikachu #085 PSA 10"
    );
    assert_eq!(
        card.image_urls(),
        vec![
            "https://img.psacard.test/85-front.jpg".to_string(),
            "https://img.psacard.test/85-back.jpg".to_string(),
        ]
    );
    assert_eq!(card.source_url, "https://www.psacard.com/cert/87654321/psa");
}

#[tokio::test]
async fn page_without_grade_is_missing_field() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/content"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Verify you are human</h1></body></html>"),
        )
        .mount(&server)
        .await;

    let err = client(&server)
        .lookup(&cert())
        .await
        .expect_err("challenge page has no grade");

    match err {
        ScraperError::MissingField { field, url, snippet } => {
            assert_eq!(field, "grade");
            assert_eq!(url, "https://www.psacard.com/cert/87654321/psa");
            assert!(snippet.contains("Verify you are human"));
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/content"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/content"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CERT_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let card = client(&server).lookup(&cert()).await.expect("second attempt succeeds");
    assert_eq!(card.grade_value(), "10");
}

#[tokio::test]
async fn errors_name_the_cert_page_not_the_service() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/content"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).lookup(&cert()).await.expect_err("403 fails");

    match err {
        ScraperError::UnexpectedStatus { status, url } => {
            assert_eq!(status, 403);
            assert!(!url.contains("browser-token"));
            assert!(url.contains("87654321"));
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}
