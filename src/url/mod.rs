//! URL handling module for site-audit
//!
//! This module provides URL normalization, domain extraction, and the
//! domain filter that decides which hosts belong to the crawled site.

mod domain;
mod normalize;

use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_strict_subdomain};
pub use normalize::{normalize_parsed, normalize_url, normalized_key};

/// Decides whether a host is part of the crawled site
///
/// A host is allowed if it equals the seed host exactly or, when
/// `allow_subdomains` is set, if it is a strict subdomain of the seed host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainFilter {
    seed_host: String,
    allow_subdomains: bool,
}

impl DomainFilter {
    /// Builds a filter anchored on the seed URL's host
    pub fn new(seed: &Url, allow_subdomains: bool) -> Result<Self, UrlError> {
        let seed_host = extract_domain(seed).ok_or(UrlError::MissingDomain)?;
        Ok(Self {
            seed_host,
            allow_subdomains,
        })
    }

    /// The lowercase seed host
    pub fn seed_host(&self) -> &str {
        &self.seed_host
    }

    /// Returns true if the URL's host belongs to the site
    pub fn allows(&self, url: &Url) -> bool {
        match extract_domain(url) {
            Some(host) => self.allows_host(&host),
            None => false,
        }
    }

    /// Returns true if the (lowercase) host belongs to the site
    pub fn allows_host(&self, host: &str) -> bool {
        host == self.seed_host
            || (self.allow_subdomains && is_strict_subdomain(host, &self.seed_host))
    }
}
