//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: Lifecycle state machine of one crawl
//! - `CrawlStatus`: Snapshot of the crawl counters

mod crawl_phase;

pub use crawl_phase::CrawlPhase;

/// Snapshot of a crawl's progress counters
///
/// `crawled` and `discovered` never decrease during a crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStatus {
    /// URLs processed (fetched, blocked or skipped)
    pub crawled: u64,
    /// URLs added to the frontier, seed included
    pub discovered: u64,
    pub running: bool,
}
