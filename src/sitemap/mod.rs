//! Sitemap handling module
//!
//! Sitemaps are fetched once during crawl setup and only used to tag
//! crawled pages as "in sitemap"; they never seed the frontier.
//!
//! Sitemap indexes are followed recursively, bounded by
//! [`MAX_SITEMAP_DEPTH`] and by a set of already fetched sitemap URLs, so
//! self-referencing or cyclic indexes terminate. Every failure is
//! swallowed at the level of the single sitemap document.

mod parser;

pub use parser::{parse_sitemap, SitemapDocument, SitemapError};

use crate::crawler::FetchClient;
use crate::url::normalized_key;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Maximum nesting of sitemap indexes below a root sitemap
pub const MAX_SITEMAP_DEPTH: usize = 5;

/// Maximum number of sitemap documents fetched per crawl
pub const MAX_SITEMAP_DOCUMENTS: usize = 500;

/// Accumulated set of URLs listed in the site's sitemaps
///
/// Grows during setup; read-only while crawling.
#[derive(Debug, Clone, Default)]
pub struct SitemapSet {
    urls: HashSet<String>,
    exists: bool,
}

impl SitemapSet {
    /// Returns true if the URL (compared in normalized form) is listed
    pub fn contains(&self, url: &str) -> bool {
        normalized_key(url)
            .map(|key| self.urls.contains(&key))
            .unwrap_or(false)
    }

    /// Whether at least one sitemap document was fetched and parsed
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Number of distinct page URLs listed
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    fn insert(&mut self, url: &str) {
        if let Ok(key) = normalized_key(url) {
            self.urls.insert(key);
        }
    }
}

/// Fetches sitemap documents and accumulates their page URLs
pub struct SitemapIndex<'a> {
    client: &'a FetchClient,
    set: SitemapSet,
    fetched: HashSet<String>,
}

impl<'a> SitemapIndex<'a> {
    pub fn new(client: &'a FetchClient) -> Self {
        Self {
            client,
            set: SitemapSet::default(),
            fetched: HashSet::new(),
        }
    }

    /// Fetches a sitemap (recursing into sitemap indexes) and adds its URLs
    ///
    /// Never fails: unreachable, non-200 or unparsable documents are logged
    /// and skipped.
    pub async fn fetch(&mut self, url: &str) {
        // Breadth-first, so each document is first reached at its shallowest depth.
        let mut pending: VecDeque<(String, usize)> = VecDeque::from([(url.to_string(), 0)]);

        while let Some((sitemap_url, depth)) = pending.pop_front() {
            if depth > MAX_SITEMAP_DEPTH {
                tracing::warn!(
                    "Sitemap {} exceeds max nesting depth {}, skipping",
                    sitemap_url,
                    MAX_SITEMAP_DEPTH
                );
                continue;
            }

            let key = normalized_key(&sitemap_url).unwrap_or_else(|_| sitemap_url.clone());
            if !self.fetched.insert(key) {
                tracing::debug!("Skipping already fetched sitemap {}", sitemap_url);
                continue;
            }

            if self.fetched.len() > MAX_SITEMAP_DOCUMENTS {
                tracing::warn!(
                    "Reached {} sitemap documents, ignoring the rest",
                    MAX_SITEMAP_DOCUMENTS
                );
                break;
            }

            let Some(document) = self.fetch_document(&sitemap_url).await else {
                continue;
            };
            self.set.exists = true;

            let base = Url::parse(&sitemap_url).ok();
            let resolved = document
                .locations()
                .iter()
                .filter_map(|loc| resolve(base.as_ref(), loc));

            match &document {
                SitemapDocument::UrlSet(_) => {
                    for loc in resolved {
                        self.set.insert(&loc);
                    }
                }
                SitemapDocument::Index(_) => {
                    for loc in resolved {
                        pending.push_back((loc, depth + 1));
                    }
                }
            }
        }
    }

    /// Consumes the index and returns the accumulated set
    pub fn into_set(self) -> SitemapSet {
        self.set
    }

    async fn fetch_document(&self, url: &str) -> Option<SitemapDocument> {
        let response = match self.client.get(url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch sitemap {}: {}", url, e);
                return None;
            }
        };

        if response.status != 200 {
            tracing::debug!("Sitemap {} returned HTTP {}", url, response.status);
            return None;
        }

        match parse_sitemap(&response.body) {
            Ok(document) => {
                tracing::debug!(
                    "Parsed sitemap {} ({} entries)",
                    url,
                    document.locations().len()
                );
                Some(document)
            }
            Err(e) => {
                tracing::warn!("Failed to parse sitemap {}: {}", url, e);
                None
            }
        }
    }
}

fn resolve(base: Option<&Url>, loc: &str) -> Option<String> {
    match Url::parse(loc) {
        Ok(url) => Some(url.into()),
        Err(_) => base.and_then(|b| b.join(loc).ok()).map(String::from),
    }
}

/// Fetches every given sitemap and returns the combined set
pub async fn fetch_sitemaps(client: &FetchClient, sitemap_urls: &[String]) -> SitemapSet {
    let mut index = SitemapIndex::new(client);
    for url in sitemap_urls {
        index.fetch(url).await;
    }
    index.into_set()
}
