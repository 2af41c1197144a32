//! HTML parser for building page records
//!
//! This module turns an HTML body into a [`PageRecord`]:
//! - Metadata (title, description, robots, canonical, lang, h1, h2, refresh)
//! - Anchors classified internal/external by exact hostname match
//! - Images, scripts, stylesheets, iframes, audio and video sources
//! - Hreflang alternates
//! - Word count, byte size and SHA-256 digests of the URL and body text
//!
//! Parsing never fails as a whole: each element that cannot be resolved to
//! an absolute http(s) URL is skipped on its own.

use crate::crawler::record::{Hreflang, Image, Link, PageRecord};
use crate::url::{extract_domain, normalized_key};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

/// Reason a single href/src was skipped
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("empty reference")]
    Empty,

    #[error("fragment-only reference")]
    FragmentOnly,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid reference: {0}")]
    Invalid(#[from] url::ParseError),
}

/// Elements whose text never counts as rendered body text
const NON_RENDERED: &[&str] = &["script", "style", "noscript", "template"];

/// Header carrying page-level robots directives for non-HTML responses
const X_ROBOTS_TAG: &str = "x-robots-tag";

/// Builds the part of a record that does not depend on the body
///
/// Used on its own for responses that are not parsed (HEAD requests,
/// non-HTML content, non-200 status).
pub fn base_record(url: &Url, status_code: u16, headers: &HeaderMap) -> PageRecord {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let media_type = content_type.as_deref().and_then(media_type);
    let robots = headers
        .get(X_ROBOTS_TAG)
        .and_then(|v| v.to_str().ok())
        .map(clean_text)
        .filter(|s| !s.is_empty());

    PageRecord {
        url: url.to_string(),
        scheme: url.scheme().to_string(),
        status_code,
        content_type,
        media_type,
        robots,
        url_hash: url_hash(url.as_str()),
        ..PageRecord::default()
    }
}

/// Parses an HTML page into a record
///
/// # Arguments
///
/// * `html` - The raw HTML body
/// * `url` - The page URL, used to resolve relative references
/// * `status_code` - HTTP status of the response
/// * `headers` - Response headers
///
/// # Example
///
/// ```
/// use reqwest::header::HeaderMap;
/// use site_audit::crawler::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let url = Url::parse("https://example.com/").unwrap();
/// let page = parse_page(html, &url, 200, &HeaderMap::new());
/// assert_eq!(page.title.as_deref(), Some("Test"));
/// assert_eq!(page.internal_links[0].url, "https://example.com/page");
/// ```
pub fn parse_page(html: &str, url: &Url, status_code: u16, headers: &HeaderMap) -> PageRecord {
    let document = Html::parse_document(html);
    let mut record = base_record(url, status_code, headers);

    record.size = html.len();
    record.title = first_text(&document, "title");
    record.h1 = first_text(&document, "h1");
    record.h2 = first_text(&document, "h2");
    record.lang = first_attr(&document, "html[lang]", "lang");
    record.canonical = first_attr(&document, "link[rel~=\"canonical\"][href]", "href")
        .and_then(|href| resolve_link(&href, url).ok())
        .map(String::from);

    extract_meta(&document, &mut record);

    let body_text = body_text(&document);
    record.words = count_words(&body_text);
    record.body_hash = sha256_hex(&body_text);

    let page_host = extract_domain(url);
    for link in extract_anchors(&document, url) {
        let target_host = Url::parse(&link.url).ok().and_then(|u| extract_domain(&u));
        if target_host.is_some() && target_host == page_host {
            record.internal_links.push(link);
        } else {
            record.external_links.push(link);
        }
    }

    record.images = select(&document, "img[src]")
        .into_iter()
        .filter_map(|el| {
            let src = resolve_attr(&el, "src", url)?;
            Some(Image {
                url: src,
                alt: el.value().attr("alt").map(clean_text),
            })
        })
        .collect();
    record.scripts = resolve_all(&document, "script[src]", "src", url);
    record.styles = resolve_all(&document, "link[rel~=\"stylesheet\"][href]", "href", url);
    record.iframes = resolve_all(&document, "iframe[src]", "src", url);
    record.audios = resolve_all(&document, "audio[src], audio source[src]", "src", url);
    record.videos = resolve_all(&document, "video[src], video source[src]", "src", url);
    record.hreflangs = select(&document, "link[rel~=\"alternate\"][hreflang][href]")
        .into_iter()
        .filter_map(|el| {
            let lang = el.value().attr("hreflang")?.trim().to_string();
            let href = resolve_attr(&el, "href", url)?;
            Some(Hreflang { lang, url: href })
        })
        .collect();

    record
}

/// Resolves an href/src against the page URL
///
/// Rejects empty and fragment-only references, and anything that does not
/// resolve to http or https (javascript:, mailto:, tel:, data:, ...).
/// The fragment of the resolved URL is dropped.
pub fn resolve_link(href: &str, base_url: &Url) -> Result<Url, LinkError> {
    let href = href.trim();

    if href.is_empty() {
        return Err(LinkError::Empty);
    }

    if href.starts_with('#') {
        return Err(LinkError::FragmentOnly);
    }

    let mut resolved = base_url.join(href)?;
    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return Err(LinkError::UnsupportedScheme(resolved.scheme().to_string()));
    }
    resolved.set_fragment(None);

    Ok(resolved)
}

/// Counts whitespace-delimited, non-empty tokens
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Hex SHA-256 of the normalized URL (of the raw string if it cannot be normalized)
pub fn url_hash(url: &str) -> String {
    let key = normalized_key(url).unwrap_or_else(|_| url.to_string());
    sha256_hex(&key)
}

fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extracts "text/html" from "Text/HTML; charset=utf-8"
fn media_type(content_type: &str) -> Option<String> {
    let media = content_type.split(';').next()?.trim().to_ascii_lowercase();
    if media.is_empty() {
        None
    } else {
        Some(media)
    }
}

/// Collapses runs of whitespace into single spaces and trims
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn select<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    select(document, css)
        .first()
        .map(|el| clean_text(&el.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    select(document, css)
        .first()
        .and_then(|el| el.value().attr(attr))
        .map(clean_text)
        .filter(|s| !s.is_empty())
}

fn resolve_attr(element: &ElementRef, attr: &str, base_url: &Url) -> Option<String> {
    let value = element.value().attr(attr)?;
    match resolve_link(value, base_url) {
        Ok(url) => Some(url.into()),
        Err(e) => {
            tracing::trace!("Skipping {}={:?} on {}: {}", attr, value, base_url, e);
            None
        }
    }
}

fn resolve_all(document: &Html, css: &str, attr: &str, base_url: &Url) -> Vec<String> {
    select(document, css)
        .iter()
        .filter_map(|el| resolve_attr(el, attr, base_url))
        .collect()
}

/// Reads description, robots and refresh from `<meta>` tags
///
/// Names are matched case-insensitively; the first tag of each kind wins.
/// A robots meta tag takes precedence over the X-Robots-Tag header.
fn extract_meta(document: &Html, record: &mut PageRecord) {
    let mut robots_meta = None;

    for meta in select(document, "meta[content]") {
        let element = meta.value();
        let Some(content) = element.attr("content").map(clean_text) else {
            continue;
        };

        if let Some(name) = element.attr("name") {
            if name.eq_ignore_ascii_case("description") && record.description.is_none() {
                record.description = Some(content).filter(|s| !s.is_empty());
            } else if name.eq_ignore_ascii_case("robots") && robots_meta.is_none() {
                robots_meta = Some(content).filter(|s| !s.is_empty());
            }
        } else if let Some(equiv) = element.attr("http-equiv") {
            if equiv.eq_ignore_ascii_case("refresh") && record.refresh.is_none() {
                record.refresh = Some(content).filter(|s| !s.is_empty());
            }
        }
    }

    if robots_meta.is_some() {
        record.robots = robots_meta;
    }
}

fn extract_anchors(document: &Html, base_url: &Url) -> Vec<Link> {
    select(document, "a[href]")
        .into_iter()
        .filter_map(|el| {
            let url = resolve_attr(&el, "href", base_url)?;
            let rel: Vec<String> = el
                .value()
                .attr("rel")
                .map(|r| r.split_whitespace().map(str::to_ascii_lowercase).collect())
                .unwrap_or_default();

            Some(Link {
                url,
                text: clean_text(&el.text().collect::<String>()),
                nofollow: rel.iter().any(|r| r == "nofollow"),
                sponsored: rel.iter().any(|r| r == "sponsored"),
                ugc: rel.iter().any(|r| r == "ugc"),
            })
        })
        .collect()
}

/// Rendered text of `<body>`, whitespace-collapsed
fn body_text(document: &Html) -> String {
    let Some(body) = select(document, "body").into_iter().next() else {
        return String::new();
    };

    let mut raw = String::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| NON_RENDERED.contains(&el.name()))
                .unwrap_or(false)
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    clean_text(&raw)
}
