//! Messages sent from a running crawl to its caller

use crate::crawler::record::PageRecord;
use crate::state::{CrawlPhase, CrawlStatus};

/// Outcome of processing one frontier item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub url: String,
    /// Always present; only 200 HTML GET responses carry parsed content
    pub page: PageRecord,
    /// Transport error message, if the fetch failed
    pub error: Option<String>,
    pub ttfb_millis: u64,
    pub blocked: bool,
    pub in_sitemap: bool,
    pub timeout: bool,
    /// 0 when no response was received
    pub status_code: u16,
}

impl CrawlResult {
    pub fn from_record(page: PageRecord, error: Option<String>) -> Self {
        Self {
            url: page.url.clone(),
            error,
            ttfb_millis: page.ttfb_millis,
            blocked: page.blocked_by_robots,
            in_sitemap: page.in_sitemap,
            timeout: page.timeout,
            status_code: page.status_code,
            page,
        }
    }
}

/// Final state of a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSummary {
    pub phase: CrawlPhase,
    pub status: CrawlStatus,
    pub robots_exists: bool,
    pub sitemap_exists: bool,
}

/// A message on a crawl's event channel
///
/// Every crawl ends with exactly one `Completed` or `Error` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlEvent {
    Response(Box<CrawlResult>),
    Status(CrawlStatus),
    Completed(CrawlSummary),
    Error(String),
}
