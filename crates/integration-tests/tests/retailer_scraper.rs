//! Integration tests for `RetailerScraper` against a mock storefront.

use rust_decimal::Decimal;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shelfwise_admin::scraper::{RetailerScraper, ScraperError};
use shelfwise_integration_tests::scraper_config;

const PRODUCT_PAGE: &str = r#"<!doctype html>
<html>
<head>
  <title>Ignored Title | Card Shop</title>
  <meta property="og:title" content="Scarlet &amp; Violet Booster Box">
  <meta property="og:image" content="/cdn/box-front.jpg">
  <meta property="product:price:amount" content="1,299.00">
  <script type="application/ld+json">
    {"@context": "https://schema.org", "@type": "Product",
     "name": "Scarlet & Violet Booster Box",
     "description": "36 packs per box.",
     "sku": "SV-BB-01",
     "brand": {"@type": "Brand", "name": "Pokemon"},
     "image": ["https://cdn.test/box-back.jpg", "/cdn/box-front.jpg"],
     "offers": {"@type": "Offer", "price": "1299.00"}}
  </script>
</head>
<body><h1>Scarlet &amp; Violet Booster Box</h1></body>
</html>"#;

fn scraper(server: &MockServer) -> RetailerScraper {
    RetailerScraper::new(&scraper_config(&server.uri())).expect("scraper builds")
}

#[tokio::test]
async fn product_page_is_parsed_from_meta_and_jsonld() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/sv-booster-box"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .mount(&server)
        .await;

    let product = scraper(&server)
        .fetch_product("/products/sv-booster-box")
        .await
        .expect("product page parses");

    assert_eq!(product.title, "Scarlet & Violet Booster Box");
    assert_eq!(product.price, Some(Decimal::new(129_900, 2)));
    assert_eq!(product.vendor.as_deref(), Some("Pokemon"));
    assert_eq!(product.sku.as_deref(), Some("SV-BB-01"));
    assert_eq!(product.description_html.as_deref(), Some("<p>36 packs per box.</p>"));
    assert_eq!(
        product.image_urls,
        vec![
            format!("{}/cdn/box-front.jpg", server.uri()),
            "https://cdn.test/box-back.jpg".to_string(),
        ],
        "relative images are absolutized and duplicates dropped"
    );
    assert_eq!(product.source_url, format!("{}/products/sv-booster-box", server.uri()));
}

#[tokio::test]
async fn missing_page_is_not_found_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = scraper(&server)
        .fetch_product("/products/gone")
        .await
        .expect_err("404 fails");

    assert!(matches!(err, ScraperError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn server_errors_are_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PRODUCT_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let product = scraper(&server)
        .fetch_product("/products/flaky")
        .await
        .expect("third attempt succeeds");

    assert_eq!(product.sku.as_deref(), Some("SV-BB-01"));
}

#[tokio::test]
async fn retries_stop_after_max_retries() {
    let server = MockServer::start().await;

    // max_retries = 2 in the test config: three attempts in total.
    Mock::given(method("GET"))
        .and(path("/products/down"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let err = scraper(&server)
        .fetch_product("/products/down")
        .await
        .expect_err("all attempts fail");

    assert!(matches!(err, ScraperError::UnexpectedStatus { status: 502, .. }));
}

#[tokio::test]
async fn page_without_title_reports_missing_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/blank"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>Coming soon</body></html>"))
        .mount(&server)
        .await;

    let err = scraper(&server)
        .fetch_product("/products/blank")
        .await
        .expect_err("no title");

    match err {
        ScraperError::MissingField { field, snippet, .. } => {
            assert_eq!(field, "title");
            assert!(snippet.contains("Coming soon"));
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[tokio::test]
async fn collection_links_are_product_pages_on_the_same_host() {
    let server = MockServer::start().await;
    let body = format!(
        r#"<html><body>
          <a href="/collections/pokemon/products/sv-booster-box">Box</a>
          <a href="/products/etb">ETB</a>
          <a href="/products/etb">ETB again</a>
          <a href="/pages/about">About</a>
          <a href="https://other.test/products/elsewhere">Elsewhere</a>
          <a href="{}/products/absolute">Absolute</a>
        </body></html>"#,
        server.uri()
    );

    Mock::given(method("GET"))
        .and(path("/collections/pokemon"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let links = scraper(&server)
        .fetch_collection("/collections/pokemon")
        .await
        .expect("collection parses");

    let base = server.uri();
    assert_eq!(
        links,
        vec![
            format!("{base}/collections/pokemon/products/sv-booster-box"),
            format!("{base}/products/etb"),
            format!("{base}/products/absolute"),
        ]
    );
}

#[test]
fn non_http_urls_are_rejected() {
    let scraper =
        RetailerScraper::new(&scraper_config("https://shop.test")).expect("scraper builds");

    let err = scraper
        .resolve_url("ftp://shop.test/products/x")
        .expect_err("ftp is rejected");
    assert!(matches!(err, ScraperError::InvalidUrl { .. }));

    let resolved = scraper.resolve_url("/products/x").expect("relative joins base");
    assert_eq!(resolved.as_str(), "https://shop.test/products/x");
}
