//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use site_audit::config::{Config, CrawlerConfig, HttpConfig, OutputConfig};
use site_audit::crawler::{CrawlEvent, CrawlResult, CrawlSummary, Crawler};
use site_audit::issues::{evaluate_issues, IssueType};
use site_audit::storage::{SqliteStorage, Storage};
use site_audit::{AuditError, CrawlPhase, CrawlRegistry};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no politeness delay
fn create_test_config() -> Config {
    Config {
        crawler: CrawlerConfig {
            max_delay_ms: 0,
            status_interval_ms: 50,
            ..CrawlerConfig::default()
        },
        http: HttpConfig::with_user_agent("TestBot/1.0"),
        output: OutputConfig {
            database_path: ":memory:".to_string(),
        },
    }
}

/// An HTML page response with the given body markup
fn html(body: &str) -> ResponseTemplate {
    html_with_head("<title>Test page</title>", body)
}

fn html_with_head(head: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><head>{head}</head><body>{body}</body></html>"),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, at: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Runs a crawl to completion and collects its results
async fn run_crawl(seed: &str, config: &Config) -> (CrawlSummary, Vec<CrawlResult>) {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let crawler = Crawler::new(Url::parse(seed).unwrap(), config).unwrap();
    let summary = crawler.run(tx).await.unwrap();

    let mut results = Vec::new();
    let mut completed = 0;
    while let Some(event) = rx.recv().await {
        match event {
            CrawlEvent::Response(result) => results.push(*result),
            CrawlEvent::Completed(_) => completed += 1,
            CrawlEvent::Error(e) => panic!("unexpected crawl error: {e}"),
            CrawlEvent::Status(_) => {}
        }
    }
    assert_eq!(completed, 1, "exactly one completion event");

    (summary, results)
}

fn result_for<'a>(results: &'a [CrawlResult], url: &str) -> &'a CrawlResult {
    results
        .iter()
        .find(|r| r.url == url)
        .unwrap_or_else(|| panic!("no result for {url}"))
}

#[tokio::test]
async fn test_crawl_stays_on_seed_host() {
    let server = MockServer::start().await;
    let base = server.uri();

    // A 404 robots.txt must not be obeyed even if its body disallows everything
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404).set_body_string("User-agent: *\nDisallow: /"))
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        html(r#"<a href="/about">About</a><a href="https://other.com/x">Other</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<p>About us</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let (summary, results) = run_crawl(&base, &create_test_config()).await;

    assert_eq!(summary.phase, CrawlPhase::Completed);
    assert!(!summary.robots_exists);
    assert_eq!(summary.status.discovered, 2);
    assert_eq!(summary.status.crawled, 2);
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.url.contains("other.com")));

    let seed = result_for(&results, &format!("{base}/"));
    assert_eq!(seed.status_code, 200);
    assert_eq!(seed.page.title.as_deref(), Some("Test page"));
    assert_eq!(seed.page.internal_links.len(), 1);
    assert_eq!(seed.page.external_links.len(), 1);
    assert!(!seed.blocked);
    assert!(!seed.timeout);
}

#[tokio::test]
async fn test_robots_disallowed_url_is_reported_not_fetched() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"),
    )
    .await;
    mount_page(
        &server,
        "/",
        html(r#"<a href="/admin">Admin</a><a href="/public">Public</a>"#),
    )
    .await;
    mount_page(&server, "/public", html("<p>Public</p>")).await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html("<p>Secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let (summary, results) = run_crawl(&base, &create_test_config()).await;

    assert!(summary.robots_exists);
    assert_eq!(summary.status.crawled, 3);

    let admin = result_for(&results, &format!("{base}/admin"));
    assert!(admin.blocked);
    assert!(admin.page.blocked_by_robots);
    assert_eq!(admin.status_code, 0);
    assert_eq!(result_for(&results, &format!("{base}/public")).status_code, 200);
}

#[tokio::test]
async fn test_ignore_robots_txt_fetches_disallowed_urls() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"),
    )
    .await;
    mount_page(&server, "/", html(r#"<a href="/admin">Admin</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html("<p>Admin</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.ignore_robots_txt = true;
    let (_, results) = run_crawl(&base, &config).await;

    assert!(!result_for(&results, &format!("{base}/admin")).blocked);
}

#[tokio::test]
async fn test_crawl_limit_is_respected() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: String = (0..10)
        .map(|i| format!(r#"<a href="/page{i}">Page {i}</a>"#))
        .collect();
    mount_page(&server, "/", html(&links)).await;
    Mock::given(method("GET"))
        .respond_with(html("<p>Leaf</p>"))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.crawl_limit = 3;
    let (summary, results) = run_crawl(&base, &config).await;

    assert_eq!(summary.phase, CrawlPhase::Completed);
    assert_eq!(summary.status.crawled, 3);
    assert_eq!(summary.status.discovered, 11);
    assert!(results.len() <= 3);
}

#[tokio::test]
async fn test_equivalent_urls_are_fetched_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(&format!(
            r#"<a href="/about">1</a><a href="/about/">2</a><a href="{base}/about#team">3</a>
               <a href="/about?b=2&a=1">4</a><a href="/about?a=1&b=2">5</a>"#
        )),
    )
    .await;
    // One fetch for /about, one for /about?a=1&b=2
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html("<p>About</p>"))
        .expect(2)
        .mount(&server)
        .await;

    let (summary, _) = run_crawl(&base, &create_test_config()).await;

    assert_eq!(summary.status.discovered, 3);
    assert_eq!(summary.status.crawled, 3);
}

#[tokio::test]
async fn test_nofollow_links_are_not_followed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html(r#"<a href="/open">Open</a><a rel="nofollow" href="/secret">Secret</a>"#),
    )
    .await;
    mount_page(&server, "/open", html("<p>Open</p>")).await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(html("<p>Secret</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let (summary, _) = run_crawl(&base, &create_test_config()).await;
    assert_eq!(summary.status.discovered, 2);
}

#[tokio::test]
async fn test_meta_nofollow_page_contributes_no_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_with_head(
            r#"<meta name="robots" content="nofollow">"#,
            r#"<a href="/next">Next</a>"#,
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html("<p>Next</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let (summary, results) = run_crawl(&base, &create_test_config()).await;
    assert_eq!(summary.status.discovered, 1);
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_noindex_page_is_followed_but_not_reported() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        html_with_head(
            r#"<meta name="robots" content="noindex">"#,
            r#"<a href="/indexed">Indexed</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/indexed", html("<p>Indexed</p>")).await;

    let (summary, results) = run_crawl(&base, &create_test_config()).await;
    assert_eq!(summary.status.crawled, 2);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, format!("{base}/indexed"));

    let mut config = create_test_config();
    config.crawler.include_noindex = true;
    let (_, results) = run_crawl(&base, &config).await;
    assert_eq!(results.len(), 2);
}

#[tokio::test]
async fn test_sitemap_tags_pages() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200)
            .set_body_string(format!("User-agent: *\nAllow: /\nSitemap: {base}/pages.xml")),
    )
    .await;
    mount_page(
        &server,
        "/pages.xml",
        ResponseTemplate::new(200).set_body_raw(
            format!("<urlset><url><loc>{base}/about/</loc></url></urlset>"),
            "application/xml",
        ),
    )
    .await;
    mount_page(&server, "/", html(r#"<a href="/about">About</a>"#)).await;
    mount_page(&server, "/about", html("<p>About</p>")).await;

    let (summary, results) = run_crawl(&base, &create_test_config()).await;

    assert!(summary.robots_exists);
    assert!(summary.sitemap_exists);
    assert!(result_for(&results, &format!("{base}/about")).in_sitemap);
    assert!(!result_for(&results, &format!("{base}/")).in_sitemap);
}

#[tokio::test]
async fn test_sitemap_not_fetched_when_disabled() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html("<p>Home</p>")).await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!("<urlset><url><loc>{base}/</loc></url></urlset>"),
            "application/xml",
        ))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.crawl_sitemap = false;
    let (summary, results) = run_crawl(&base, &config).await;

    assert!(!summary.sitemap_exists);
    assert!(!results[0].in_sitemap);
}

#[tokio::test]
async fn test_redirect_target_is_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html(r#"<a href="/old">Old</a>"#)).await;
    mount_page(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/new"),
    )
    .await;
    mount_page(&server, "/new", html("<p>New</p>")).await;

    let (_, results) = run_crawl(&base, &create_test_config()).await;

    let old = result_for(&results, &format!("{base}/old"));
    assert_eq!(old.status_code, 200);
    assert_eq!(
        old.page.redirect_url.as_deref(),
        Some(format!("{base}/new").as_str())
    );
}

#[tokio::test]
async fn test_non_html_is_not_parsed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(&server, "/", html(r#"<a href="/data.json">Data</a>"#)).await;
    mount_page(
        &server,
        "/data.json",
        ResponseTemplate::new(200).set_body_raw(r#"{"a": "<a href='/x'>"}"#, "application/json"),
    )
    .await;

    let (summary, results) = run_crawl(&base, &create_test_config()).await;

    assert_eq!(summary.status.discovered, 2);
    let data = result_for(&results, &format!("{base}/data.json"));
    assert_eq!(data.status_code, 200);
    assert!(!data.page.is_parsed());
    assert_eq!(data.page.media_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_external_links_are_checked_with_head() {
    let server = MockServer::start().await;
    let external = MockServer::start().await;
    let base = server.uri();
    let external_port = Url::parse(&external.uri()).unwrap().port().unwrap();

    // "localhost" is a different host from the seed's 127.0.0.1
    let external_url = format!("http://localhost:{external_port}/gone");
    mount_page(&server, "/", html(&format!(r#"<a href="{external_url}">Gone</a>"#))).await;
    Mock::given(method("HEAD"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&external)
        .await;

    let mut config = create_test_config();
    config.crawler.check_external_links = true;
    let (summary, results) = run_crawl(&base, &config).await;

    assert_eq!(summary.status.discovered, 2);
    let gone = result_for(&results, &external_url);
    assert_eq!(gone.status_code, 404);
    assert!(!gone.page.is_parsed());
}

#[tokio::test]
async fn test_seed_with_trailing_slash_is_fetched_as_given() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/docs/"))
        .respond_with(html(r#"<a href="/docs/intro">Intro</a>"#))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/docs/intro", html("<p>Intro</p>")).await;

    let (summary, results) = run_crawl(&format!("{base}/docs/"), &create_test_config()).await;

    assert_eq!(summary.status.discovered, 2);
    assert_eq!(summary.status.crawled, 2);
    let seed = result_for(&results, &format!("{base}/docs/"));
    assert_eq!(seed.status_code, 200);
    assert_eq!(seed.page.redirect_url, None);
}

#[tokio::test]
async fn test_stop_discards_in_flight_result() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>Slow</p>").set_delay(Duration::from_millis(800)))
        .expect(1)
        .mount(&server)
        .await;

    let registry = CrawlRegistry::new();
    let mut events = registry
        .start(1, Url::parse(&base).unwrap(), &create_test_config())
        .unwrap();

    // Setup is done well before this; the seed fetch is in flight
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(registry.stop(1));

    let mut responses = 0;
    let mut summary = None;
    while let Some(event) = events.recv().await {
        match event {
            CrawlEvent::Response(_) => responses += 1,
            CrawlEvent::Completed(s) => summary = Some(s),
            _ => {}
        }
    }

    let summary = summary.unwrap();
    assert_eq!(responses, 0);
    assert_eq!(summary.phase, CrawlPhase::Stopped);
    assert_eq!(summary.status.crawled, 1);
    assert_eq!(summary.status.discovered, 1);
}

#[tokio::test]
async fn test_registry_rejects_second_start_and_stops() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<p>Slow</p>").set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let registry = CrawlRegistry::new();
    let config = create_test_config();
    let seed = Url::parse(&base).unwrap();

    let mut events = registry.start(1, seed.clone(), &config).unwrap();
    assert!(registry.is_running(1));

    let err = registry.start(1, seed, &config).unwrap_err();
    assert!(matches!(err, AuditError::AlreadyRunning { project_id: 1 }));

    assert!(registry.stop(1));
    assert!(!registry.stop(1));

    let mut responses = 0;
    let mut summary = None;
    while let Some(event) = events.recv().await {
        match event {
            CrawlEvent::Response(_) => responses += 1,
            CrawlEvent::Completed(s) => summary = Some(s),
            _ => {}
        }
    }

    assert_eq!(responses, 0);
    assert_eq!(summary.unwrap().phase, CrawlPhase::Stopped);
    assert!(!registry.is_running(1));
    assert_eq!(registry.phase(1), Some(CrawlPhase::Stopped));
}

#[tokio::test]
async fn test_results_feed_storage_and_issue_engine() {
    let server = MockServer::start().await;
    let base = server.uri();
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("audit.db");

    mount_page(
        &server,
        "/",
        html(r#"<a href="/copy-a">A</a><a href="/copy-b">B</a><a href="/missing">M</a>"#),
    )
    .await;
    mount_page(&server, "/copy-a", html("<p>Same words</p>")).await;
    mount_page(&server, "/copy-b", html("<p>Same words</p>")).await;
    mount_page(&server, "/missing", ResponseTemplate::new(404)).await;

    let (summary, results) = run_crawl(&base, &create_test_config()).await;

    let mut storage = SqliteStorage::new(&db_path).unwrap();
    let crawl_id = storage.create_crawl(1, &base, "hash").unwrap();
    for result in &results {
        storage.insert_page(crawl_id, &result.page).unwrap();
    }
    storage.finish_crawl(crawl_id, &summary).unwrap();

    let pages = storage.load_pages(crawl_id).unwrap();
    assert_eq!(pages.len(), 4);

    let issues = evaluate_issues(&pages);
    storage.insert_issues(crawl_id, &issues).unwrap();
    let counts = storage.count_issues_by_type(crawl_id).unwrap();

    assert_eq!(counts.get(&IssueType::DuplicatedContent), Some(&2));
    assert_eq!(counts.get(&IssueType::Error4xx), Some(&1));
    // The three 200 pages share the same title; the 404 has none
    assert_eq!(counts.get(&IssueType::DuplicatedTitle), Some(&3));

    let crawl = storage.get_crawl(crawl_id).unwrap();
    assert_eq!(crawl.phase, CrawlPhase::Completed);
    assert_eq!(crawl.crawled, 4);
}
