//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the site-audit database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawls
CREATE TABLE IF NOT EXISTS crawls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL,
    seed_url TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    robots_exists INTEGER NOT NULL DEFAULT 0,
    sitemap_exists INTEGER NOT NULL DEFAULT 0,
    crawled INTEGER NOT NULL DEFAULT 0,
    discovered INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_crawls_project ON crawls(project_id);

-- One row per processed URL
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_id INTEGER NOT NULL REFERENCES crawls(id),
    url TEXT NOT NULL,
    scheme TEXT NOT NULL,
    redirect_url TEXT,
    refresh TEXT,
    status_code INTEGER NOT NULL,
    content_type TEXT,
    media_type TEXT,
    lang TEXT,
    title TEXT,
    description TEXT,
    robots TEXT,
    canonical TEXT,
    h1 TEXT,
    h2 TEXT,
    words INTEGER NOT NULL DEFAULT 0,
    size INTEGER NOT NULL DEFAULT 0,
    url_hash TEXT NOT NULL,
    body_hash TEXT NOT NULL,
    blocked_by_robots INTEGER NOT NULL DEFAULT 0,
    in_sitemap INTEGER NOT NULL DEFAULT 0,
    timeout INTEGER NOT NULL DEFAULT 0,
    ttfb_millis INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_crawl ON pages(crawl_id);
CREATE INDEX IF NOT EXISTS idx_pages_url_hash ON pages(url_hash);

-- Child collections of a page: links, images and other resources
CREATE TABLE IF NOT EXISTS page_links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL REFERENCES pages(id),
    kind TEXT NOT NULL,
    url TEXT NOT NULL,
    text TEXT,
    nofollow INTEGER NOT NULL DEFAULT 0,
    sponsored INTEGER NOT NULL DEFAULT 0,
    ugc INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_page_links_page ON page_links(page_id);

-- Issues found by the rule engine
CREATE TABLE IF NOT EXISTS issues (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crawl_id INTEGER NOT NULL REFERENCES crawls(id),
    page_id INTEGER NOT NULL REFERENCES pages(id),
    issue_type INTEGER NOT NULL,
    UNIQUE(page_id, issue_type)
);

CREATE INDEX IF NOT EXISTS idx_issues_crawl ON issues(crawl_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
