//! Storage module for persisting crawl data
//!
//! This module is the sink for crawl events and the source the issue
//! engine reads from:
//! - SQLite database initialization and schema management
//! - Crawl rows with their final phase and counters
//! - Page records and their link/resource collections
//! - Issue rows, deduplicated per (page, issue type)

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::PageRecord;
use crate::state::CrawlPhase;

use std::path::Path;

/// Opens or creates a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// A page record as stored, with its database identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub id: i64,
    pub crawl_id: i64,
    pub record: PageRecord,
}

/// Represents a crawl in the database
#[derive(Debug, Clone)]
pub struct CrawlRecord {
    pub id: i64,
    pub project_id: i64,
    pub seed_url: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub phase: CrawlPhase,
    pub robots_exists: bool,
    pub sitemap_exists: bool,
    pub crawled: u64,
    pub discovered: u64,
}
