//! Regex-based extraction helpers shared by the scrapers.
//!
//! Pages are parsed with targeted regexes rather than a DOM: the scrapers
//! only need meta tags, JSON-LD blocks, anchors and a few labelled cells.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Characters of page text attached to parse errors.
pub const SNIPPET_LEN: usize = 200;

static META_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid regex"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

static JSONLD_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

static TITLE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid regex"));

static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']([^"']+)["']"#).expect("valid regex")
});

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\s[^>]*>").expect("valid regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Attributes of every `<meta>` tag in document order.
fn meta_tags(html: &str) -> impl Iterator<Item = Vec<(String, String)>> + '_ {
    META_TAG.find_iter(html).map(|m| attributes(m.as_str()))
}

/// Parse `name="value"` pairs from a single tag. Names are lowercased.
pub fn attributes(tag: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(tag)
        .filter_map(|cap| {
            let name = cap.get(1)?.as_str().to_ascii_lowercase();
            let value = cap.get(2).or_else(|| cap.get(3))?.as_str();
            Some((name, decode_entities(value)))
        })
        .collect()
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

/// All `content` values of meta tags whose `property` or `name` is `key`.
pub fn meta_contents(html: &str, key: &str) -> Vec<String> {
    meta_tags(html)
        .filter(|attrs| {
            attr(attrs, "property")
                .or_else(|| attr(attrs, "name"))
                .is_some_and(|k| k.eq_ignore_ascii_case(key))
        })
        .filter_map(|attrs| attr(&attrs, "content").map(str::trim).map(ToString::to_string))
        .filter(|c| !c.is_empty())
        .collect()
}

/// First non-empty `content` of meta tags keyed `key`.
pub fn meta_content(html: &str, key: &str) -> Option<String> {
    meta_contents(html, key).into_iter().next()
}

/// Every JSON-LD object on the page, with top-level arrays and `@graph`
/// containers flattened. Blocks that fail to parse are skipped.
pub fn jsonld_objects(html: &str) -> Vec<serde_json::Value> {
    let mut objects = Vec::new();

    for cap in JSONLD_SCRIPT.captures_iter(html) {
        let Some(body) = cap.get(1) else { continue };
        let Ok(value) = serde_json::from_str::<serde_json::Value>(body.as_str().trim()) else {
            continue;
        };

        let items = match value {
            serde_json::Value::Array(items) => items,
            other => vec![other],
        };
        for item in items {
            if let Some(graph) = item.get("@graph").and_then(serde_json::Value::as_array) {
                objects.extend(graph.iter().cloned());
            }
            objects.push(item);
        }
    }

    objects
}

/// Whether a JSON-LD object's `@type` (string or array) includes `wanted`.
pub fn has_jsonld_type(item: &serde_json::Value, wanted: &str) -> bool {
    match item.get("@type") {
        Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case(wanted),
        Some(serde_json::Value::Array(types)) => types
            .iter()
            .filter_map(serde_json::Value::as_str)
            .any(|s| s.eq_ignore_ascii_case(wanted)),
        _ => false,
    }
}

/// Text of the `<title>` element.
pub fn title_tag(html: &str) -> Option<String> {
    TITLE_TAG
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| clean_text(m.as_str()))
        .filter(|t| !t.is_empty())
}

/// `href` of every anchor in document order.
pub fn hrefs(html: &str) -> impl Iterator<Item = String> + '_ {
    HREF.captures_iter(html)
        .filter_map(|cap| cap.get(1).map(|m| decode_entities(m.as_str())))
}

/// Attributes of every `<img>` tag in document order.
pub fn images(html: &str) -> impl Iterator<Item = Vec<(String, String)>> + '_ {
    IMG_TAG.find_iter(html).map(|m| attributes(m.as_str()))
}

/// Look up an attribute parsed by [`attributes`].
pub fn attribute<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attr(attrs, name)
}

/// Resolve `href` against `base`, dropping query and fragment.
pub fn absolutize(base: &Url, href: &str) -> Option<Url> {
    let mut url = base.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);
    Some(url)
}

/// Remove duplicates while keeping first-seen order.
pub fn dedupe_in_order(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Strip tags, decode entities and collapse whitespace.
pub fn clean_text(fragment: &str) -> String {
    let without_tags = TAG.replace_all(fragment, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

/// Decode the handful of HTML entities storefronts actually emit.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_owned();
    }
    s.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Escape text for use inside HTML content or a quoted attribute.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// First [`SNIPPET_LEN`] characters of the page with whitespace collapsed.
pub fn snippet(html: &str) -> String {
    WHITESPACE
        .replace_all(html.trim(), " ")
        .chars()
        .take(SNIPPET_LEN)
        .collect()
}
