//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::{CrawlSummary, PageRecord};
use crate::issues::{IssueRecord, IssueType};
use crate::storage::{CrawlRecord, StoredPage};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Crawl not found: {0}")]
    CrawlNotFound(i64),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The sink the caller persists crawl events into, and the source the
/// issue engine reads a finished crawl from.
pub trait Storage {
    // ===== Crawl Management =====

    /// Creates a crawl row in the `running` state
    ///
    /// # Arguments
    ///
    /// * `project_id` - Project the crawl belongs to
    /// * `seed_url` - The crawl's seed URL
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created crawl
    fn create_crawl(&mut self, project_id: i64, seed_url: &str, config_hash: &str)
        -> StorageResult<i64>;

    /// Gets a crawl by ID
    fn get_crawl(&self, crawl_id: i64) -> StorageResult<CrawlRecord>;

    /// Records the final phase, counters and robots/sitemap flags
    fn finish_crawl(&mut self, crawl_id: i64, summary: &CrawlSummary) -> StorageResult<()>;

    // ===== Page Management =====

    /// Inserts a page record with its child collections
    ///
    /// # Returns
    ///
    /// The page ID, used as `page_record_id` by the issue engine
    fn insert_page(&mut self, crawl_id: i64, page: &PageRecord) -> StorageResult<i64>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<StoredPage>;

    /// Loads every page of a crawl, in insertion order
    fn load_pages(&self, crawl_id: i64) -> StorageResult<Vec<StoredPage>>;

    // ===== Issues =====

    /// Inserts issues, ignoring any (page, issue type) pair already stored
    ///
    /// # Returns
    ///
    /// The number of newly inserted issues
    fn insert_issues(&mut self, crawl_id: i64, issues: &[IssueRecord]) -> StorageResult<usize>;

    /// Counts a crawl's issues per issue type
    fn count_issues_by_type(&self, crawl_id: i64) -> StorageResult<HashMap<IssueType, u64>>;
}
