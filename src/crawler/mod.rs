//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with TTFB measurement
//! - HTML parsing into page records
//! - The frontier queue and visited store
//! - Overall crawl coordination and the crawl registry

mod coordinator;
mod events;
mod fetcher;
mod frontier;
mod parser;
mod record;
mod registry;

pub use coordinator::{CrawlHandle, Crawler};
pub use events::{CrawlEvent, CrawlResult, CrawlSummary};
pub use fetcher::{build_http_client, FetchClient, FetchError, FetchResponse, HttpMethod};
pub use frontier::{Frontier, FrontierItem, VisitedStore};
pub use parser::{base_record, count_words, parse_page, resolve_link, url_hash, LinkError};
pub use record::{Hreflang, Image, Link, PageRecord};
pub use registry::CrawlRegistry;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the guard if a worker panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
