//! Retailer product and collection page scraper.

use std::str::FromStr;

use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::error::status_error;
use super::{ScraperError, USER_AGENT, html, retry_with_backoff};
use crate::config::ScraperConfig;

/// Product details read from a retailer product page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedProduct {
    pub title: String,
    pub price: Option<Decimal>,
    pub description_html: Option<String>,
    pub vendor: Option<String>,
    pub sku: Option<String>,
    pub image_urls: Vec<String>,
    pub source_url: String,
}

/// HTTP scraper for a third-party retailer's storefront pages.
///
/// Transient errors (429, 5xx, network failures) are retried with
/// exponential backoff up to `max_retries` additional attempts.
#[derive(Debug, Clone)]
pub struct RetailerScraper {
    client: Client,
    base_url: Option<Url>,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl RetailerScraper {
    /// Build a scraper from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `RETAILER_BASE_URL` does not
    /// parse, or [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &ScraperConfig) -> Result<Self, ScraperError> {
        let base_url = config
            .retailer_base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| ScraperError::InvalidUrl {
                    url: raw.to_owned(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
            backoff_base_secs: config.backoff_base_secs,
        })
    }

    /// Resolve a user-supplied page URL. Relative paths are joined to the
    /// configured retailer base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if the URL is relative with no
    /// base configured, or is not http(s).
    pub fn resolve_url(&self, raw: &str) -> Result<Url, ScraperError> {
        let invalid = |reason: &str| ScraperError::InvalidUrl {
            url: raw.to_owned(),
            reason: reason.to_owned(),
        };

        let url = match Url::parse(raw.trim()) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self
                    .base_url
                    .as_ref()
                    .ok_or_else(|| invalid("relative URL and RETAILER_BASE_URL is not set"))?;
                base.join(raw.trim()).map_err(|e| invalid(&e.to_string()))?
            }
            Err(e) => return Err(invalid(&e.to_string())),
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("only http and https URLs are supported"));
        }
        Ok(url)
    }

    /// Fetch a collection page and return its product page URLs.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the page cannot be fetched.
    #[instrument(skip(self))]
    pub async fn fetch_collection(&self, url: &str) -> Result<Vec<String>, ScraperError> {
        let page_url = self.resolve_url(url)?;
        let body = self.fetch_html(&page_url).await?;
        let links = parse_collection_links(&body, &page_url);
        tracing::info!(count = links.len(), "collection scraped");
        Ok(links)
    }

    /// Fetch a product page and extract its details.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be fetched or has no title.
    #[instrument(skip(self))]
    pub async fn fetch_product(&self, url: &str) -> Result<ScrapedProduct, ScraperError> {
        let page_url = self.resolve_url(url)?;
        let body = self.fetch_html(&page_url).await?;
        parse_product_page(&body, &page_url)
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self.client.get(url.as_str()).send().await?;
            if let Some(err) = status_error(&response, url.as_str()) {
                return Err(err);
            }
            Ok(response.text().await?)
        })
        .await
    }
}

/// Product page links (`/products/<handle>`) in page order, absolute and
/// without duplicates.
#[must_use]
pub fn parse_collection_links(body: &str, page_url: &Url) -> Vec<String> {
    html::dedupe_in_order(
        html::hrefs(body)
            .filter_map(|href| html::absolutize(page_url, &href))
            .filter(|u| u.host_str() == page_url.host_str())
            .filter(|u| is_product_path(u.path()))
            .map(String::from),
    )
}

fn is_product_path(path: &str) -> bool {
    path.split('/')
        .collect::<Vec<_>>()
        .windows(2)
        .any(|pair| matches!(pair, ["products", handle] if !handle.is_empty()))
}

/// Extract product details from `og:` meta tags and JSON-LD `Product`
/// data, falling back to `<title>` for the name.
///
/// # Errors
///
/// Returns [`ScraperError::MissingField`] when no title can be found.
pub fn parse_product_page(body: &str, page_url: &Url) -> Result<ScrapedProduct, ScraperError> {
    let product_ld = html::jsonld_objects(body)
        .into_iter()
        .find(|o| html::has_jsonld_type(o, "Product"));
    let ld = product_ld.as_ref();

    let title = html::meta_content(body, "og:title")
        .or_else(|| ld.and_then(|p| string_field(p, "name")))
        .or_else(|| html::title_tag(body))
        .ok_or_else(|| ScraperError::MissingField {
            field: "title",
            url: page_url.to_string(),
            snippet: html::snippet(body),
        })?;

    let price = html::meta_content(body, "product:price:amount")
        .or_else(|| html::meta_content(body, "og:price:amount"))
        .or_else(|| ld.and_then(jsonld_price))
        .and_then(|raw| parse_price(&raw));

    let description_html = ld
        .and_then(|p| string_field(p, "description"))
        .or_else(|| html::meta_content(body, "og:description"))
        .map(|d| format!("<p>{}</p>", html::escape_text(&d)));

    let vendor = ld
        .and_then(|p| p.get("brand"))
        .and_then(|b| match b {
            Value::String(s) => Some(s.clone()),
            other => string_field(other, "name"),
        })
        .or_else(|| html::meta_content(body, "product:brand"));

    let sku = ld.and_then(|p| string_field(p, "sku"));

    let mut images = html::meta_contents(body, "og:image");
    if let Some(p) = ld {
        images.extend(jsonld_images(p));
    }
    let image_urls = html::dedupe_in_order(
        images
            .iter()
            .filter_map(|src| html::absolutize(page_url, src))
            .map(String::from),
    );

    Ok(ScrapedProduct {
        title,
        price,
        description_html,
        vendor,
        sku,
        image_urls,
        source_url: page_url.to_string(),
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(html::clean_text)
        .filter(|s| !s.is_empty())
}

/// `offers.price`, where `offers` may be an object or an array.
fn jsonld_price(product: &Value) -> Option<String> {
    let offers = product.get("offers")?;
    let offer = match offers {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match offer.get("price").or_else(|| offer.get("lowPrice"))? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `image` as a string, an array of strings, or `ImageObject`s.
fn jsonld_images(product: &Value) -> Vec<String> {
    let one = |v: &Value| match v {
        Value::String(s) => Some(s.clone()),
        other => other.get("url").and_then(Value::as_str).map(String::from),
    };
    match product.get("image") {
        Some(Value::Array(items)) => items.iter().filter_map(one).collect(),
        Some(v) => one(v).into_iter().collect(),
        None => Vec::new(),
    }
}

/// Parse "1,299.00", "$12.50", "12,50" and similar into a decimal.
///
/// A comma is the decimal separator when there is no dot and it is
/// followed by one or two digits; otherwise commas group thousands.
/// Anything with a minus sign is rejected rather than read as positive.
fn parse_price(raw: &str) -> Option<Decimal> {
    if raw.contains('-') {
        return None;
    }
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ','))
        .collect();

    let decimal_comma = !kept.contains('.')
        && kept.matches(',').count() == 1
        && kept
            .rsplit(',')
            .next()
            .is_some_and(|frac| (1..=2).contains(&frac.len()));
    let normalised = if decimal_comma {
        kept.replace(',', ".")
    } else {
        kept.replace(',', "")
    };

    Decimal::from_str(&normalised).ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://retailer.test/products/blue-mug").unwrap()
    }

    #[test]
    fn parses_og_and_jsonld() {
        let body = r#"
            <html><head>
            <title>Blue Mug | Retailer</title>
            <meta property="og:title" content="Blue Mug">
            <meta property="og:image" content="//cdn.retailer.test/mug.jpg">
            <meta property="product:price:amount" content="1,299.00">
            <script type="application/ld+json">
              {"@type":"Product","name":"Blue Mug","sku":"MUG-1",
               "brand":{"@type":"Brand","name":"Potter"},
               "description":"Stoneware mug",
               "image":["https://cdn.retailer.test/mug.jpg","https://cdn.retailer.test/mug-2.jpg"],
               "offers":{"price":"1299.00"}}
            </script>
            </head></html>
        "#;
        let product = parse_product_page(body, &page_url()).unwrap();
        assert_eq!(product.title, "Blue Mug");
        assert_eq!(product.price, Some(Decimal::new(129_900, 2)));
        assert_eq!(product.vendor.as_deref(), Some("Potter"));
        assert_eq!(product.sku.as_deref(), Some("MUG-1"));
        assert_eq!(
            product.description_html.as_deref(),
            Some("<p>Stoneware mug</p>")
        );
        assert_eq!(
            product.image_urls,
            vec![
                "https://cdn.retailer.test/mug.jpg",
                "https://cdn.retailer.test/mug-2.jpg"
            ]
        );
        assert_eq!(product.source_url, "https://retailer.test/products/blue-mug");
    }

    #[test]
    fn falls_back_to_title_tag() {
        let body = "<html><head><title>Plain Page</title></head></html>";
        let product = parse_product_page(body, &page_url()).unwrap();
        assert_eq!(product.title, "Plain Page");
        assert_eq!(product.price, None);
        assert!(product.image_urls.is_empty());
    }

    #[test]
    fn missing_title_carries_snippet() {
        let body = format!("<html><body>{}</body></html>", "captcha ".repeat(100));
        let err = parse_product_page(&body, &page_url()).unwrap_err();
        match err {
            ScraperError::MissingField { field, snippet, .. } => {
                assert_eq!(field, "title");
                assert!(snippet.starts_with("<html><body>captcha"));
                assert_eq!(snippet.chars().count(), html::SNIPPET_LEN);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn collection_links_are_absolute_and_deduped() {
        let body = r#"
            <a href="/products/blue-mug">Blue</a>
            <a href="/collections/mugs/products/red-mug?variant=3">Red</a>
            <a href="/products/blue-mug#reviews">Blue again</a>
            <a href="https://elsewhere.test/products/x">Other site</a>
            <a href="/pages/about">About</a>
            <a href="/products/">Empty</a>
        "#;
        let base = Url::parse("https://retailer.test/collections/mugs").unwrap();
        assert_eq!(
            parse_collection_links(body, &base),
            vec![
                "https://retailer.test/products/blue-mug",
                "https://retailer.test/collections/mugs/products/red-mug",
            ]
        );
    }

    #[test]
    fn resolve_relative_requires_base() {
        let scraper = RetailerScraper::new(&ScraperConfig::default()).unwrap();
        assert!(matches!(
            scraper.resolve_url("/products/a"),
            Err(ScraperError::InvalidUrl { .. })
        ));

        let scraper = RetailerScraper::new(&ScraperConfig {
            retailer_base_url: Some("https://retailer.test".to_string()),
            ..ScraperConfig::default()
        })
        .unwrap();
        assert_eq!(
            scraper.resolve_url("/products/a").unwrap().as_str(),
            "https://retailer.test/products/a"
        );
        assert!(scraper.resolve_url("ftp://retailer.test/a").is_err());
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price("$12.50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_price("1,299.00"), Some(Decimal::new(129_900, 2)));
        assert_eq!(parse_price("1,299"), Some(Decimal::from(1299)));
        assert_eq!(parse_price("free"), None);
    }

    #[test]
    fn decimal_comma_prices() {
        assert_eq!(parse_price("12,50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_price("12,5 €"), Some(Decimal::new(125, 1)));
        assert_eq!(parse_price("1,299,000"), Some(Decimal::from(1_299_000)));
    }

    #[test]
    fn negative_prices_are_rejected() {
        assert_eq!(parse_price("-12.50"), None);
        assert_eq!(parse_price("$-5"), None);
    }

    #[test]
    fn scraped_description_is_escaped() {
        let body = r#"
            <meta property="og:title" content="Blue Mug">
            <meta property="og:description" content="Mug &lt;script&gt;alert(1)&lt;/script&gt; &amp; saucer">
        "#;
        let product = parse_product_page(body, &page_url()).unwrap();
        assert_eq!(
            product.description_html.as_deref(),
            Some("<p>Mug &lt;script&gt;alert(1)&lt;/script&gt; &amp; saucer</p>")
        );
    }
}
