//! Frontier queue and visited store
//!
//! Neither type synchronizes on its own. The coordinator keeps both behind
//! one mutex so that `VisitedStore::add` and `Frontier::add` form a single
//! check-then-act step across workers.

use crate::crawler::fetcher::HttpMethod;
use crate::url::normalized_key;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A pending fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierItem {
    pub url: Url,
    pub method: HttpMethod,
    /// Set for external link checks, which bypass the domain filter
    pub ignore_domain_filter: bool,
}

impl FrontierItem {
    /// A GET of a crawlable page
    pub fn page(url: Url) -> Self {
        Self {
            url,
            method: HttpMethod::Get,
            ignore_domain_filter: false,
        }
    }

    /// A HEAD status check of an external link
    pub fn external_check(url: Url) -> Self {
        Self {
            url,
            method: HttpMethod::Head,
            ignore_domain_filter: true,
        }
    }
}

/// FIFO work queue
#[derive(Debug, Default)]
pub struct Frontier {
    items: VecDeque<FrontierItem>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, item: FrontierItem) {
        self.items.push_back(item);
    }

    /// Takes the oldest item, or None when drained
    pub fn poll(&mut self) -> Option<FrontierItem> {
        self.items.pop_front()
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drops every pending item
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Set of normalized URLs already scheduled during a crawl
#[derive(Debug, Default)]
pub struct VisitedStore {
    keys: HashSet<String>,
}

impl VisitedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, url: &Url) -> bool {
        self.keys.contains(&key(url))
    }

    /// Records the URL; returns false if an equivalent URL was already recorded
    pub fn add(&mut self, url: &Url) -> bool {
        self.keys.insert(key(url))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn key(url: &Url) -> String {
    normalized_key(url.as_str()).unwrap_or_else(|_| url.to_string())
}
