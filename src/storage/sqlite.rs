//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::crawler::{CrawlSummary, Hreflang, Image, Link, PageRecord};
use crate::issues::{IssueRecord, IssueType};
use crate::state::CrawlPhase;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CrawlRecord, StoredPage};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const PAGE_COLUMNS: &str = "id, crawl_id, url, scheme, redirect_url, refresh, status_code, \
     content_type, media_type, lang, title, description, robots, canonical, h1, h2, words, \
     size, url_hash, body_hash, blocked_by_robots, in_sitemap, timeout, ttfb_millis";

const CRAWL_COLUMNS: &str = "id, project_id, seed_url, config_hash, started_at, finished_at, \
     status, robots_exists, sitemap_exists, crawled, discovered";

/// Kinds of rows in the `page_links` table
mod kind {
    pub const INTERNAL: &str = "internal";
    pub const EXTERNAL: &str = "external";
    pub const IMAGE: &str = "image";
    pub const SCRIPT: &str = "script";
    pub const STYLE: &str = "style";
    pub const IFRAME: &str = "iframe";
    pub const AUDIO: &str = "audio";
    pub const VIDEO: &str = "video";
    pub const HREFLANG: &str = "hreflang";
}

/// One `page_links` row
struct ChildRow<'a> {
    kind: &'static str,
    url: &'a str,
    text: Option<&'a str>,
    nofollow: bool,
    sponsored: bool,
    ugc: bool,
}

impl<'a> ChildRow<'a> {
    fn resource(kind: &'static str, url: &'a str) -> Self {
        Self {
            kind,
            url,
            text: None,
            nofollow: false,
            sponsored: false,
            ugc: false,
        }
    }

    fn link(kind: &'static str, link: &'a Link) -> Self {
        Self {
            kind,
            url: &link.url,
            text: Some(&link.text),
            nofollow: link.nofollow,
            sponsored: link.sponsored,
            ugc: link.ugc,
        }
    }
}

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn load_children(&self, page_id: i64, page: &mut PageRecord) -> StorageResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT kind, url, text, nofollow, sponsored, ugc FROM page_links
             WHERE page_id = ?1 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![page_id])?;

        while let Some(row) = rows.next()? {
            let kind: String = row.get(0)?;
            let url: String = row.get(1)?;
            let text: Option<String> = row.get(2)?;

            match kind.as_str() {
                kind::INTERNAL | kind::EXTERNAL => {
                    let link = Link {
                        url,
                        text: text.unwrap_or_default(),
                        nofollow: row.get(3)?,
                        sponsored: row.get(4)?,
                        ugc: row.get(5)?,
                    };
                    if kind == kind::INTERNAL {
                        page.internal_links.push(link);
                    } else {
                        page.external_links.push(link);
                    }
                }
                kind::IMAGE => page.images.push(Image { url, alt: text }),
                kind::SCRIPT => page.scripts.push(url),
                kind::STYLE => page.styles.push(url),
                kind::IFRAME => page.iframes.push(url),
                kind::AUDIO => page.audios.push(url),
                kind::VIDEO => page.videos.push(url),
                kind::HREFLANG => page.hreflangs.push(Hreflang {
                    lang: text.unwrap_or_default(),
                    url,
                }),
                other => tracing::warn!("Ignoring unknown page_links kind {:?}", other),
            }
        }

        Ok(())
    }
}

fn page_from_row(row: &Row) -> rusqlite::Result<StoredPage> {
    Ok(StoredPage {
        id: row.get(0)?,
        crawl_id: row.get(1)?,
        record: PageRecord {
            url: row.get(2)?,
            scheme: row.get(3)?,
            redirect_url: row.get(4)?,
            refresh: row.get(5)?,
            status_code: row.get(6)?,
            content_type: row.get(7)?,
            media_type: row.get(8)?,
            lang: row.get(9)?,
            title: row.get(10)?,
            description: row.get(11)?,
            robots: row.get(12)?,
            canonical: row.get(13)?,
            h1: row.get(14)?,
            h2: row.get(15)?,
            words: row.get::<_, i64>(16)? as usize,
            size: row.get::<_, i64>(17)? as usize,
            url_hash: row.get(18)?,
            body_hash: row.get(19)?,
            blocked_by_robots: row.get(20)?,
            in_sitemap: row.get(21)?,
            timeout: row.get(22)?,
            ttfb_millis: row.get::<_, i64>(23)? as u64,
            ..PageRecord::default()
        },
    })
}

fn crawl_from_row(row: &Row) -> rusqlite::Result<CrawlRecord> {
    Ok(CrawlRecord {
        id: row.get(0)?,
        project_id: row.get(1)?,
        seed_url: row.get(2)?,
        config_hash: row.get(3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        phase: CrawlPhase::from_db_string(&row.get::<_, String>(6)?)
            .unwrap_or(CrawlPhase::Running),
        robots_exists: row.get(7)?,
        sitemap_exists: row.get(8)?,
        crawled: row.get::<_, i64>(9)? as u64,
        discovered: row.get::<_, i64>(10)? as u64,
    })
}

fn child_rows(page: &PageRecord) -> Vec<ChildRow<'_>> {
    let mut rows = Vec::new();
    rows.extend(
        page.internal_links
            .iter()
            .map(|l| ChildRow::link(kind::INTERNAL, l)),
    );
    rows.extend(
        page.external_links
            .iter()
            .map(|l| ChildRow::link(kind::EXTERNAL, l)),
    );
    rows.extend(page.images.iter().map(|image| ChildRow {
        text: image.alt.as_deref(),
        ..ChildRow::resource(kind::IMAGE, &image.url)
    }));
    for (kind, urls) in [
        (kind::SCRIPT, &page.scripts),
        (kind::STYLE, &page.styles),
        (kind::IFRAME, &page.iframes),
        (kind::AUDIO, &page.audios),
        (kind::VIDEO, &page.videos),
    ] {
        rows.extend(urls.iter().map(|url| ChildRow::resource(kind, url)));
    }
    rows.extend(page.hreflangs.iter().map(|h| ChildRow {
        text: Some(&h.lang),
        ..ChildRow::resource(kind::HREFLANG, &h.url)
    }));
    rows
}

impl Storage for SqliteStorage {
    // ===== Crawl Management =====

    fn create_crawl(
        &mut self,
        project_id: i64,
        seed_url: &str,
        config_hash: &str,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawls (project_id, seed_url, config_hash, started_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                project_id,
                seed_url,
                config_hash,
                now,
                CrawlPhase::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_crawl(&self, crawl_id: i64) -> StorageResult<CrawlRecord> {
        self.conn
            .query_row(
                &format!("SELECT {CRAWL_COLUMNS} FROM crawls WHERE id = ?1"),
                params![crawl_id],
                crawl_from_row,
            )
            .optional()?
            .ok_or(StorageError::CrawlNotFound(crawl_id))
    }

    fn finish_crawl(&mut self, crawl_id: i64, summary: &CrawlSummary) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawls SET finished_at = ?1, status = ?2, robots_exists = ?3,
             sitemap_exists = ?4, crawled = ?5, discovered = ?6 WHERE id = ?7",
            params![
                now,
                summary.phase.to_db_string(),
                summary.robots_exists,
                summary.sitemap_exists,
                summary.status.crawled as i64,
                summary.status.discovered as i64,
                crawl_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::CrawlNotFound(crawl_id));
        }
        Ok(())
    }

    // ===== Page Management =====

    fn insert_page(&mut self, crawl_id: i64, page: &PageRecord) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO pages (crawl_id, url, scheme, redirect_url, refresh, status_code,
                content_type, media_type, lang, title, description, robots, canonical, h1, h2,
                words, size, url_hash, body_hash, blocked_by_robots, in_sitemap, timeout,
                ttfb_millis, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params![
                crawl_id,
                page.url,
                page.scheme,
                page.redirect_url,
                page.refresh,
                page.status_code,
                page.content_type,
                page.media_type,
                page.lang,
                page.title,
                page.description,
                page.robots,
                page.canonical,
                page.h1,
                page.h2,
                page.words as i64,
                page.size as i64,
                page.url_hash,
                page.body_hash,
                page.blocked_by_robots,
                page.in_sitemap,
                page.timeout,
                page.ttfb_millis as i64,
                now
            ],
        )?;
        let page_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO page_links (page_id, kind, url, text, nofollow, sponsored, ugc)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for child in child_rows(page) {
                stmt.execute(params![
                    page_id,
                    child.kind,
                    child.url,
                    child.text,
                    child.nofollow,
                    child.sponsored,
                    child.ugc
                ])?;
            }
        }

        tx.commit()?;
        Ok(page_id)
    }

    fn get_page(&self, page_id: i64) -> StorageResult<StoredPage> {
        let mut page = self
            .conn
            .query_row(
                &format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1"),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))?;

        self.load_children(page.id, &mut page.record)?;
        Ok(page)
    }

    fn load_pages(&self, crawl_id: i64) -> StorageResult<Vec<StoredPage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PAGE_COLUMNS} FROM pages WHERE crawl_id = ?1 ORDER BY id"
        ))?;
        let mut pages = stmt
            .query_map(params![crawl_id], page_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        for page in &mut pages {
            self.load_children(page.id, &mut page.record)?;
        }

        Ok(pages)
    }

    // ===== Issues =====

    fn insert_issues(&mut self, crawl_id: i64, issues: &[IssueRecord]) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO issues (crawl_id, page_id, issue_type) VALUES (?1, ?2, ?3)",
            )?;
            for issue in issues {
                inserted += stmt.execute(params![
                    crawl_id,
                    issue.page_record_id,
                    issue.issue_type.id()
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn count_issues_by_type(&self, crawl_id: i64) -> StorageResult<HashMap<IssueType, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT issue_type, COUNT(*) FROM issues WHERE crawl_id = ?1 GROUP BY issue_type",
        )?;

        let rows = stmt.query_map(params![crawl_id], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (type_id, count) = row?;
            match IssueType::from_id(type_id) {
                Some(issue_type) => {
                    counts.insert(issue_type, count as u64);
                }
                None => tracing::warn!("Ignoring unknown issue type id {}", type_id),
            }
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CrawlStatus;

    fn sample_page() -> PageRecord {
        PageRecord {
            url: "https://example.com/".to_string(),
            scheme: "https".to_string(),
            status_code: 200,
            media_type: Some("text/html".to_string()),
            title: Some("Home".to_string()),
            words: 42,
            size: 1024,
            url_hash: "u".repeat(64),
            body_hash: "b".repeat(64),
            in_sitemap: true,
            ttfb_millis: 17,
            internal_links: vec![Link {
                url: "https://example.com/about".to_string(),
                text: "About".to_string(),
                nofollow: true,
                sponsored: false,
                ugc: false,
            }],
            external_links: vec![Link {
                url: "https://other.com/".to_string(),
                text: String::new(),
                nofollow: false,
                sponsored: true,
                ugc: true,
            }],
            images: vec![
                Image {
                    url: "https://example.com/a.png".to_string(),
                    alt: Some("A".to_string()),
                },
                Image {
                    url: "https://example.com/b.png".to_string(),
                    alt: None,
                },
            ],
            scripts: vec!["https://example.com/app.js".to_string()],
            styles: vec!["https://example.com/main.css".to_string()],
            iframes: vec!["https://video.example.net/embed".to_string()],
            audios: vec!["https://example.com/a.mp3".to_string()],
            videos: vec!["https://example.com/v.mp4".to_string()],
            hreflangs: vec![Hreflang {
                lang: "de".to_string(),
                url: "https://example.com/de/".to_string(),
            }],
            ..PageRecord::default()
        }
    }

    #[test]
    fn test_create_and_finish_crawl() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let crawl_id = storage
            .create_crawl(7, "https://example.com/", "abc123")
            .unwrap();

        let crawl = storage.get_crawl(crawl_id).unwrap();
        assert_eq!(crawl.project_id, 7);
        assert_eq!(crawl.phase, CrawlPhase::Running);
        assert!(crawl.finished_at.is_none());

        let summary = CrawlSummary {
            phase: CrawlPhase::Completed,
            status: CrawlStatus {
                crawled: 10,
                discovered: 12,
                running: false,
            },
            robots_exists: true,
            sitemap_exists: false,
        };
        storage.finish_crawl(crawl_id, &summary).unwrap();

        let crawl = storage.get_crawl(crawl_id).unwrap();
        assert_eq!(crawl.phase, CrawlPhase::Completed);
        assert_eq!(crawl.crawled, 10);
        assert_eq!(crawl.discovered, 12);
        assert!(crawl.robots_exists);
        assert!(!crawl.sitemap_exists);
        assert!(crawl.finished_at.is_some());
    }

    #[test]
    fn test_missing_crawl() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_crawl(99),
            Err(StorageError::CrawlNotFound(99))
        ));

        let summary = CrawlSummary {
            phase: CrawlPhase::Stopped,
            status: CrawlStatus::default(),
            robots_exists: false,
            sitemap_exists: false,
        };
        assert!(storage.finish_crawl(99, &summary).is_err());
    }

    #[test]
    fn test_page_roundtrip_with_children() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let crawl_id = storage.create_crawl(1, "https://example.com/", "h").unwrap();

        let page = sample_page();
        let page_id = storage.insert_page(crawl_id, &page).unwrap();

        let stored = storage.get_page(page_id).unwrap();
        assert_eq!(stored.id, page_id);
        assert_eq!(stored.crawl_id, crawl_id);
        assert_eq!(stored.record, page);
    }

    #[test]
    fn test_load_pages_by_crawl() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.create_crawl(1, "https://example.com/", "h").unwrap();
        let second = storage.create_crawl(1, "https://example.com/", "h").unwrap();

        let blocked = PageRecord {
            url: "https://example.com/admin".to_string(),
            blocked_by_robots: true,
            ..PageRecord::default()
        };
        storage.insert_page(first, &sample_page()).unwrap();
        storage.insert_page(first, &blocked).unwrap();
        storage.insert_page(second, &sample_page()).unwrap();

        let pages = storage.load_pages(first).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].record.internal_links.len(), 1);
        assert!(pages[1].record.blocked_by_robots);
        assert!(pages[1].record.internal_links.is_empty());

        assert!(matches!(
            storage.get_page(1000),
            Err(StorageError::PageNotFound(1000))
        ));
    }

    #[test]
    fn test_insert_issues_ignores_duplicates() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let crawl_id = storage.create_crawl(1, "https://example.com/", "h").unwrap();
        let page_id = storage.insert_page(crawl_id, &sample_page()).unwrap();

        let issues = vec![
            IssueRecord {
                page_record_id: page_id,
                issue_type: IssueType::ShortTitle,
            },
            IssueRecord {
                page_record_id: page_id,
                issue_type: IssueType::LittleContent,
            },
        ];

        assert_eq!(storage.insert_issues(crawl_id, &issues).unwrap(), 2);
        assert_eq!(storage.insert_issues(crawl_id, &issues).unwrap(), 0);

        let counts = storage.count_issues_by_type(crawl_id).unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[&IssueType::ShortTitle], 1);
        assert_eq!(counts[&IssueType::LittleContent], 1);
    }
}
