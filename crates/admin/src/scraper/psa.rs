//! PSA certificate lookup through a headless browser service.
//!
//! psacard.com sits behind bot protection, so pages are rendered by an
//! external browser service (`POST {endpoint}/content?token=...`) that
//! returns the final HTML. The protection cookie is configuration and is
//! forwarded with every lookup. Each lookup is an independent request; no
//! browser context is reused.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;
use url::Url;

use shelfwise_core::CertNumber;

use super::error::status_error;
use super::{ScraperError, USER_AGENT, html, retry_with_backoff};
use crate::config::{PsaBrowserConfig, ScraperConfig};

const CERT_PAGE_BASE: &str = "https://www.psacard.com/cert";
const COOKIE_DOMAIN: &str = ".psacard.com";

static TRAILING_GRADE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*$").expect("valid regex"));

/// A graded card as described by its PSA certificate page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsaCert {
    pub cert_number: CertNumber,
    /// Grade label as printed, e.g. `GEM MT 10`.
    pub grade: String,
    pub year: Option<String>,
    pub brand: Option<String>,
    pub subject: String,
    pub card_number: Option<String>,
    pub variety: Option<String>,
    pub front_image: Option<String>,
    pub back_image: Option<String>,
    pub source_url: String,
}

impl PsaCert {
    /// Numeric part of the grade (`GEM MT 10` → `10`), or the full label.
    #[must_use]
    pub fn grade_value(&self) -> &str {
        TRAILING_GRADE
            .captures(&self.grade)
            .and_then(|c| c.get(1))
            .map_or(self.grade.as_str(), |m| m.as_str())
    }

    /// `"{year} {brand} {subject} #{number} PSA {grade}"`, skipping absent
    /// parts.
    #[must_use]
    pub fn product_title(&self) -> String {
        let number = self.card_number.as_ref().map(|n| format!("#{n}"));
        let grade = format!("PSA {}", self.grade_value());

        [
            self.year.as_deref(),
            self.brand.as_deref(),
            Some(self.subject.as_str()),
            number.as_deref(),
            Some(grade.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Product tags for a graded card.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        vec![
            "PSA".to_string(),
            format!("PSA {}", self.grade_value()),
            "graded".to_string(),
        ]
    }

    /// Front then back image URLs, whichever are present.
    #[must_use]
    pub fn image_urls(&self) -> Vec<String> {
        self.front_image
            .iter()
            .chain(self.back_image.iter())
            .cloned()
            .collect()
    }

    /// Simple HTML description listing the certificate details.
    #[must_use]
    pub fn description_html(&self) -> String {
        let mut rows = vec![
            format!("<li>Certificate: {}</li>", self.cert_number),
            format!("<li>Grade: {}</li>", html::escape_text(&self.grade)),
        ];
        if let Some(variety) = &self.variety {
            rows.push(format!("<li>Variety: {}</li>", html::escape_text(variety)));
        }
        format!("<ul>{}</ul>", rows.join(""))
    }
}

#[derive(Debug, Serialize)]
struct ContentRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cookies: Vec<BrowserCookie<'a>>,
}

#[derive(Debug, Serialize)]
struct BrowserCookie<'a> {
    name: &'a str,
    value: &'a str,
    domain: &'a str,
}

/// Client for PSA certificate pages.
#[derive(Clone)]
pub struct PsaClient {
    client: Client,
    endpoint: String,
    token: SecretString,
    bypass_cookie: Option<SecretString>,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl std::fmt::Debug for PsaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PsaClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl PsaClient {
    /// Build a client from the browser service settings.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(browser: &PsaBrowserConfig, scraper: &ScraperConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(scraper.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: browser.endpoint.trim_end_matches('/').to_owned(),
            token: browser.token.clone(),
            bypass_cookie: browser.bypass_cookie.clone(),
            max_retries: scraper.max_retries,
            backoff_base_secs: scraper.backoff_base_secs,
        })
    }

    /// Render and parse the certificate page for `cert`.
    ///
    /// # Errors
    ///
    /// Returns an error if the browser service fails or the page lacks a
    /// grade or subject.
    #[instrument(skip(self, cert), fields(cert = %cert))]
    pub async fn lookup(&self, cert: &CertNumber) -> Result<PsaCert, ScraperError> {
        let page_url = format!("{CERT_PAGE_BASE}/{cert}/psa");
        let body = self.render(&page_url).await?;
        parse_cert_page(&body, cert, &page_url)
    }

    async fn render(&self, page_url: &str) -> Result<String, ScraperError> {
        let mut endpoint = Url::parse(&format!("{}/content", self.endpoint)).map_err(|e| {
            ScraperError::InvalidUrl {
                url: self.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;
        endpoint
            .query_pairs_mut()
            .append_pair("token", self.token.expose_secret());

        let cookie = self
            .bypass_cookie
            .as_ref()
            .and_then(|c| c.expose_secret().split_once('='));
        let request = ContentRequest {
            url: page_url,
            cookies: cookie
                .map(|(name, value)| BrowserCookie {
                    name: name.trim(),
                    value: value.trim(),
                    domain: COOKIE_DOMAIN,
                })
                .into_iter()
                .collect(),
        };

        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let endpoint = endpoint.clone();
            let request = &request;
            async move {
                let response = self
                    .client
                    .post(endpoint.as_str())
                    .json(request)
                    .send()
                    .await?;
                // Report the page URL, not the tokenized service URL.
                if let Some(err) = status_error(&response, page_url) {
                    return Err(err);
                }
                Ok(response.text().await?)
            }
        })
        .await
    }
}

/// Extract certificate details from a rendered PSA cert page.
///
/// Values are read from label/value pairs laid out as `<dt>/<dd>` or
/// `<th>/<td>` cells.
///
/// # Errors
///
/// Returns [`ScraperError::MissingField`] if the grade or subject is absent.
pub fn parse_cert_page(
    body: &str,
    cert: &CertNumber,
    page_url: &str,
) -> Result<PsaCert, ScraperError> {
    let missing = |field: &'static str| ScraperError::MissingField {
        field,
        url: page_url.to_owned(),
        snippet: html::snippet(body),
    };

    let grade = labelled_value(body, &["Item Grade", "Grade"]).ok_or_else(|| missing("grade"))?;
    let subject =
        labelled_value(body, &["Subject", "Player", "Card Name"]).ok_or_else(|| missing("subject"))?;

    let (front_image, back_image) = cert_images(body);

    Ok(PsaCert {
        cert_number: cert.clone(),
        grade,
        year: labelled_value(body, &["Year"]),
        brand: labelled_value(body, &["Brand/Title", "Brand", "Set"]),
        subject,
        card_number: labelled_value(body, &["Card Number", "Card #", "Number"])
            .map(|n| n.trim_start_matches('#').to_owned()),
        variety: labelled_value(body, &["Variety/Pedigree", "Variety"]),
        front_image,
        back_image,
        source_url: page_url.to_owned(),
    })
}

fn labelled_value(body: &str, labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| {
        let pattern = format!(
            r"(?is)<(?:dt|th)[^>]*>\s*(?:<[^>]+>\s*)*{}\s*(?:</[^>]+>\s*)*</(?:dt|th)>\s*<(?:dd|td)[^>]*>(.*?)</(?:dd|td)>",
            regex::escape(label)
        );
        let re = Regex::new(&pattern).ok()?;
        re.captures(body)
            .and_then(|c| c.get(1))
            .map(|m| html::clean_text(m.as_str()))
            .filter(|v| !v.is_empty())
    })
}

/// Front and back slab images, identified by `alt` or `src` mentioning
/// "front"/"back"; falls back to `og:image` for the front.
fn cert_images(body: &str) -> (Option<String>, Option<String>) {
    let mut front = None;
    let mut back = None;

    for attrs in html::images(body) {
        let Some(src) = html::attribute(&attrs, "src").filter(|s| s.starts_with("http")) else {
            continue;
        };
        let hint = format!(
            "{} {}",
            html::attribute(&attrs, "alt").unwrap_or_default(),
            src
        )
        .to_ascii_lowercase();

        if front.is_none() && hint.contains("front") {
            front = Some(src.to_owned());
        } else if back.is_none() && hint.contains("back") {
            back = Some(src.to_owned());
        }
    }

    (front.or_else(|| html::meta_content(body, "og:image")), back)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><meta property="og:image" content="https://img.test/og.jpg"></head>
        <body>
          <dl>
            <dt>Item Grade</dt><dd>GEM MT 10</dd>
            <dt>Year</dt><dd>1999</dd>
            <dt>Brand/Title</dt><dd>Pokemon Game</dd>
            <dt>Subject</dt><dd><span>Charizard-Holo</span></dd>
            <dt>Card Number</dt><dd>4</dd>
            <dt>Variety/Pedigree</dt><dd>1st Edition</dd>
          </dl>
          <img alt="Front of card" src="https://img.test/front.jpg">
          <img alt="Back of card" src="https://img.test/back.jpg">
        </body></html>
    "#;

    fn cert() -> CertNumber {
        CertNumber::parse("48213377").unwrap()
    }

    #[test]
    fn parses_definition_list() {
        let parsed = parse_cert_page(PAGE, &cert(), "https://www.psacard.com/cert/48213377/psa")
            .unwrap();
        assert_eq!(parsed.grade, "GEM MT 10");
        assert_eq!(parsed.year.as_deref(), Some("1999"));
        assert_eq!(parsed.brand.as_deref(), Some("Pokemon Game"));
        assert_eq!(parsed.subject, "Charizard-Holo");
        assert_eq!(parsed.card_number.as_deref(), Some("4"));
        assert_eq!(parsed.variety.as_deref(), Some("1st Edition"));
        assert_eq!(parsed.front_image.as_deref(), Some("https://img.test/front.jpg"));
        assert_eq!(parsed.back_image.as_deref(), Some("https://img.test/back.jpg"));
    }

    #[test]
    fn product_title_and_tags() {
        let parsed = parse_cert_page(PAGE, &cert(), "u").unwrap();
        assert_eq!(
            parsed.product_title(),
            "1999 Pokemon Game Charizard-Holo #4 PSA 10"
        );
        assert_eq!(parsed.tags(), vec!["PSA", "PSA 10", "graded"]);
    }

    #[test]
    fn title_skips_missing_parts() {
        let body = "<table><tr><th>Grade</th><td>NM-MT 8.5</td></tr>\
                    <tr><th>Subject</th><td>Pikachu</td></tr></table>";
        let parsed = parse_cert_page(body, &cert(), "u").unwrap();
        assert_eq!(parsed.product_title(), "Pikachu PSA 8.5");
        assert!(parsed.image_urls().is_empty());
    }

    #[test]
    fn missing_grade_is_an_error() {
        let body = "<dl><dt>Subject</dt><dd>Pikachu</dd></dl>";
        let err = parse_cert_page(body, &cert(), "u").unwrap_err();
        assert!(matches!(
            err,
            ScraperError::MissingField { field: "grade", .. }
        ));
    }
}
