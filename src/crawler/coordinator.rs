//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates:
//! - Fetching robots.txt and sitemaps once during setup
//! - A fixed pool of workers sharing one frontier and visited store
//! - Fetching, parsing and link discovery per frontier item
//! - Emitting result events and periodic status snapshots
//! - Stop, completion and crawl-level faults
//!
//! The frontier, the visited store and the counters live behind a single
//! mutex; polling an item, enqueueing discovered links and updating the
//! counters each happen in one critical section. Fetches run outside it.

use crate::config::{validate, validate_seed_url, Config, CrawlerConfig};
use crate::crawler::events::{CrawlEvent, CrawlResult, CrawlSummary};
use crate::crawler::fetcher::{FetchClient, HttpMethod};
use crate::crawler::frontier::{Frontier, FrontierItem, VisitedStore};
use crate::crawler::lock;
use crate::crawler::parser::{base_record, parse_page};
use crate::crawler::record::PageRecord;
use crate::robots::{fetch_robots, ParsedRobots};
use crate::sitemap::{fetch_sitemaps, SitemapSet};
use crate::state::{CrawlPhase, CrawlStatus};
use crate::url::{normalized_key, DomainFilter};
use crate::{AuditError, Result};
use rand::Rng;
use reqwest::header::HeaderMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

/// How long an idle worker sleeps before polling the frontier again
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Frontier, visited store and counters, guarded together
#[derive(Debug, Default)]
struct CrawlQueue {
    frontier: Frontier,
    visited: VisitedStore,
    crawled: u64,
    discovered: u64,
    in_flight: u64,
}

impl CrawlQueue {
    /// Schedules a URL unless an equivalent one was scheduled before
    fn enqueue(&mut self, item: FrontierItem) -> bool {
        if !self.visited.add(&item.url) {
            return false;
        }
        self.frontier.add(item);
        self.discovered += 1;
        true
    }
}

/// State shared between the crawl task, its workers and its handles
#[derive(Debug)]
struct Shared {
    queue: Mutex<CrawlQueue>,
    phase: Mutex<CrawlPhase>,
    running: AtomicBool,
}

impl Shared {
    fn new() -> Self {
        Self {
            queue: Mutex::new(CrawlQueue::default()),
            phase: Mutex::new(CrawlPhase::Idle),
            running: AtomicBool::new(false),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn phase(&self) -> CrawlPhase {
        *lock(&self.phase)
    }

    fn transition(&self, to: CrawlPhase) -> Result<()> {
        let mut phase = lock(&self.phase);
        if !phase.can_transition_to(to) {
            return Err(AuditError::InvalidTransition { from: *phase, to });
        }
        tracing::debug!("Crawl phase {} -> {}", *phase, to);
        *phase = to;
        Ok(())
    }

    fn status(&self) -> CrawlStatus {
        let queue = lock(&self.queue);
        CrawlStatus {
            crawled: queue.crawled,
            discovered: queue.discovered,
            running: self.is_running(),
        }
    }

    /// Stops handing out work and drops the pending frontier
    fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        lock(&self.queue).frontier.clear();
    }
}

/// Handle for observing and stopping a crawl from outside its task
#[derive(Debug, Clone)]
pub struct CrawlHandle {
    shared: Arc<Shared>,
}

impl CrawlHandle {
    /// Requests a stop
    ///
    /// Clears the frontier and flips the running flag. In-flight fetches
    /// are not interrupted; their results are discarded. Returns false if
    /// the crawl is not running.
    pub fn stop(&self) -> bool {
        if self.shared.transition(CrawlPhase::Stopping).is_err() {
            return false;
        }
        self.shared.halt();
        tracing::info!("Crawl stop requested");
        true
    }

    pub fn status(&self) -> CrawlStatus {
        self.shared.status()
    }

    pub fn phase(&self) -> CrawlPhase {
        self.shared.phase()
    }

    /// Returns true until the crawl reaches a terminal phase
    pub fn is_running(&self) -> bool {
        self.shared.phase().is_active()
    }
}

/// Immutable per-crawl context shared by all workers
struct CrawlContext {
    settings: CrawlerConfig,
    client: FetchClient,
    filter: DomainFilter,
    robots: ParsedRobots,
    sitemap: SitemapSet,
    shared: Arc<Shared>,
    events: UnboundedSender<CrawlEvent>,
}

/// What a worker should do next
enum Next {
    Item(FrontierItem),
    Wait,
    Done,
}

/// A single-site crawl
///
/// # Example
///
/// ```no_run
/// use site_audit::config::load_config;
/// use site_audit::crawler::{CrawlEvent, Crawler};
/// use std::path::Path;
/// use url::Url;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let seed = Url::parse("https://example.com/")?;
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
///
/// let crawl = tokio::spawn(Crawler::new(seed, &config)?.run(tx));
/// while let Some(event) = rx.recv().await {
///     if let CrawlEvent::Response(result) = event {
///         println!("{} {}", result.status_code, result.url);
///     }
/// }
/// crawl.await??;
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    seed: Url,
    settings: CrawlerConfig,
    user_agent: String,
    client: FetchClient,
    filter: DomainFilter,
    shared: Arc<Shared>,
}

impl Crawler {
    /// Creates a crawler for the seed URL
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run, in the `Idle` phase
    /// * `Err(AuditError)` - The configuration is invalid, the seed has no
    ///   host, or the HTTP client could not be built
    pub fn new(seed: Url, config: &Config) -> Result<Self> {
        validate(config)?;

        // Fetched as given; normalization only keys the visited store.
        let mut seed = validate_seed_url(seed.as_str())?;
        seed.set_fragment(None);
        let filter = DomainFilter::new(&seed, config.crawler.allow_subdomains)?;
        let client = FetchClient::new(&config.http)?;

        Ok(Self {
            seed,
            settings: config.crawler.clone(),
            user_agent: config.http.user_agent.clone(),
            client,
            filter,
            shared: Arc::new(Shared::new()),
        })
    }

    /// Returns a handle for stopping and observing this crawl
    pub fn handle(&self) -> CrawlHandle {
        CrawlHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Runs the crawl to its end on the current task
    ///
    /// Events are sent on `events` as they happen; the final summary is
    /// both sent and returned.
    pub async fn run(self, events: UnboundedSender<CrawlEvent>) -> Result<CrawlSummary> {
        self.begin()?;
        self.execute(events).await
    }

    /// Starts the crawl on a new tokio task
    ///
    /// The crawl is already `Running` when this returns, so the handle can
    /// stop it immediately.
    pub fn spawn(
        self,
        events: UnboundedSender<CrawlEvent>,
    ) -> Result<(CrawlHandle, JoinHandle<Result<CrawlSummary>>)> {
        self.begin()?;
        let handle = self.handle();
        let task = tokio::spawn(self.execute(events));
        Ok((handle, task))
    }

    fn begin(&self) -> Result<()> {
        self.shared.transition(CrawlPhase::Running)?;
        self.shared.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn execute(self, events: UnboundedSender<CrawlEvent>) -> Result<CrawlSummary> {
        tracing::info!(
            "Starting crawl of {} ({} workers, limit {})",
            self.seed,
            self.settings.workers,
            self.settings.crawl_limit
        );

        let robots = fetch_robots(&self.client, &self.seed, &self.user_agent).await;
        let sitemap = self.load_sitemaps(&robots).await;
        let robots_exists = robots.exists();
        let sitemap_exists = sitemap.exists();

        if self.shared.is_running() {
            lock(&self.shared.queue).enqueue(FrontierItem::page(self.seed.clone()));
        }

        let ctx = Arc::new(CrawlContext {
            settings: self.settings.clone(),
            client: self.client.clone(),
            filter: self.filter.clone(),
            robots,
            sitemap,
            shared: Arc::clone(&self.shared),
            events: events.clone(),
        });

        let mut workers = JoinSet::new();
        for id in 0..self.settings.workers {
            workers.spawn(run_worker(id, Arc::clone(&ctx)));
        }

        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.settings.status_interval_ms));
        ticker.tick().await;

        let mut failure: Option<String> = None;
        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    Some(Ok(())) => {}
                    Some(Err(e)) => {
                        failure = Some(e.to_string());
                        break;
                    }
                    None => break,
                },
                _ = ticker.tick() => {
                    let _ = events.send(CrawlEvent::Status(self.shared.status()));
                }
            }
        }

        if let Some(message) = failure {
            return self.fail(workers, &events, message).await;
        }

        // Draining is only reachable from Running; anything else is a stop.
        let stopped = self.shared.transition(CrawlPhase::Draining).is_err();
        if stopped {
            self.shared.transition(CrawlPhase::Stopped)?;
        } else {
            self.shared.halt();
        }

        let status = self.shared.status();
        let _ = events.send(CrawlEvent::Status(status));

        if !stopped {
            self.shared.transition(CrawlPhase::Completed)?;
        }

        let summary = CrawlSummary {
            phase: self.shared.phase(),
            status,
            robots_exists,
            sitemap_exists,
        };
        let _ = events.send(CrawlEvent::Completed(summary));

        tracing::info!(
            "Crawl {}: {} crawled, {} discovered",
            summary.phase,
            status.crawled,
            status.discovered
        );

        Ok(summary)
    }

    /// Aborts the crawl after a worker fault
    async fn fail(
        &self,
        mut workers: JoinSet<()>,
        events: &UnboundedSender<CrawlEvent>,
        message: String,
    ) -> Result<CrawlSummary> {
        tracing::error!("Crawl worker failed: {}", message);

        // A user stop racing with the fault keeps its own exit path.
        if self.shared.phase() == CrawlPhase::Running {
            self.shared.transition(CrawlPhase::Erroring)?;
        }
        self.shared.halt();
        workers.shutdown().await;

        let _ = events.send(CrawlEvent::Error(message.clone()));
        self.shared.transition(CrawlPhase::Stopped)?;

        Err(AuditError::WorkerFailed(message))
    }

    async fn load_sitemaps(&self, robots: &ParsedRobots) -> SitemapSet {
        if !self.settings.crawl_sitemap {
            return SitemapSet::default();
        }

        let declared = robots.sitemaps();
        let urls: Vec<String> = if declared.is_empty() {
            match self.seed.join("/sitemap.xml") {
                Ok(url) => vec![url.into()],
                Err(_) => Vec::new(),
            }
        } else {
            declared.to_vec()
        };

        let set = fetch_sitemaps(&self.client, &urls).await;
        tracing::info!(
            "Sitemap {}: {} URLs",
            if set.exists() { "loaded" } else { "not found" },
            set.len()
        );
        set
    }
}

/// Worker loop: pulls items until the crawl ends or the limit is reached
async fn run_worker(id: usize, ctx: Arc<CrawlContext>) {
    tracing::debug!("Worker {} started", id);

    loop {
        let next = {
            let mut queue = lock(&ctx.shared.queue);
            if !ctx.shared.is_running()
                || queue.crawled + queue.in_flight >= ctx.settings.crawl_limit
            {
                Next::Done
            } else if let Some(item) = queue.frontier.poll() {
                // Already deduplicated by `CrawlQueue::enqueue`; every frontier
                // item is in the visited store exactly once.
                queue.in_flight += 1;
                Next::Item(item)
            } else if queue.in_flight == 0 {
                Next::Done
            } else {
                Next::Wait
            }
        };

        let item = match next {
            Next::Item(item) => item,
            Next::Wait => {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                continue;
            }
            Next::Done => break,
        };

        let result = process_item(&ctx, &item).await;

        if let Some(result) = result {
            if !ctx.shared.is_running() {
                tracing::debug!("Discarding result for {} after stop", result.url);
            } else if ctx
                .events
                .send(CrawlEvent::Response(Box::new(result)))
                .is_err()
            {
                tracing::warn!("Event receiver dropped, stopping crawl");
                if ctx.shared.transition(CrawlPhase::Stopping).is_ok() {
                    ctx.shared.halt();
                }
            }
        }

        let mut queue = lock(&ctx.shared.queue);
        queue.in_flight -= 1;
        queue.crawled += 1;
    }

    tracing::debug!("Worker {} finished", id);
}

/// Processes one frontier item
///
/// Returns the result to emit, or None when the item produced nothing to
/// report (domain-rejected, or a noindex page when noindex pages are
/// excluded).
async fn process_item(ctx: &CrawlContext, item: &FrontierItem) -> Option<CrawlResult> {
    let url = &item.url;

    if !item.ignore_domain_filter && !ctx.filter.allows(url) {
        tracing::trace!("Skipping {}: outside the crawled site", url);
        return None;
    }

    let in_sitemap = ctx.sitemap.contains(url.as_str());

    if !item.ignore_domain_filter
        && !ctx.settings.ignore_robots_txt
        && !ctx.robots.is_allowed(url.as_str())
    {
        tracing::debug!("Blocked by robots.txt: {}", url);
        let mut page = base_record(url, 0, &HeaderMap::new());
        page.blocked_by_robots = true;
        page.in_sitemap = in_sitemap;
        return Some(CrawlResult::from_record(page, None));
    }

    politeness_delay(ctx.settings.max_delay_ms).await;

    let response = match ctx.client.fetch(url.as_str(), item.method).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Fetch failed: {}", e);
            let mut page = base_record(url, 0, &HeaderMap::new());
            page.timeout = true;
            page.in_sitemap = in_sitemap;
            return Some(CrawlResult::from_record(page, Some(e.to_string())));
        }
    };

    tracing::debug!("{} {} -> {}", item.method, url, response.status);

    let parse = item.method == HttpMethod::Get && response.status == 200 && response.is_html();
    let mut page = if parse {
        parse_page(&response.body, &response.final_url, response.status, &response.headers)
    } else {
        base_record(&response.final_url, response.status, &response.headers)
    };
    restore_requested_url(&mut page, url, &response.final_url);
    page.in_sitemap = in_sitemap;
    page.ttfb_millis = response.ttfb_millis();

    if parse {
        enqueue_links(ctx, &page);

        if page.is_noindex() && !ctx.settings.include_noindex {
            tracing::debug!("Not reporting noindex page {}", url);
            return None;
        }
    }

    Some(CrawlResult::from_record(page, None))
}

/// Keeps the record keyed by the requested URL and notes any redirect target
fn restore_requested_url(page: &mut PageRecord, requested: &Url, final_url: &Url) {
    let requested_key = normalized_key(requested.as_str()).ok();
    let final_key = normalized_key(final_url.as_str()).ok();
    if requested_key != final_key {
        page.redirect_url = Some(final_url.to_string());
    }

    let fresh = base_record(requested, page.status_code, &HeaderMap::new());
    page.url = fresh.url;
    page.scheme = fresh.scheme;
    page.url_hash = fresh.url_hash;
}

/// Schedules the page's links that pass the nofollow and domain filters
fn enqueue_links(ctx: &CrawlContext, page: &PageRecord) {
    let settings = &ctx.settings;
    if page.is_nofollow() && !settings.follow_nofollow {
        tracing::debug!("Not following links of nofollow page {}", page.url);
        return;
    }

    let mut candidates = Vec::new();
    for link in page.internal_links.iter().chain(&page.external_links) {
        let Ok(target) = Url::parse(&link.url) else {
            continue;
        };

        if ctx.filter.allows(&target) {
            if link.nofollow && !settings.follow_nofollow {
                tracing::trace!("Skipping nofollow link {}", target);
                continue;
            }
            candidates.push(FrontierItem::page(target));
        } else if settings.check_external_links {
            candidates.push(FrontierItem::external_check(target));
        } else {
            tracing::trace!("Skipping {}: outside the crawled site", target);
        }
    }

    if candidates.is_empty() {
        return;
    }

    let mut queue = lock(&ctx.shared.queue);
    if !ctx.shared.is_running() {
        return;
    }
    let added = candidates
        .into_iter()
        .filter(|item| queue.enqueue(item.clone()))
        .count();
    if added > 0 {
        tracing::trace!("Discovered {} new URLs on {}", added, page.url);
    }
}

/// Sleeps for a random duration up to `max_delay_ms`
async fn politeness_delay(max_delay_ms: u64) {
    if max_delay_ms == 0 {
        return;
    }
    let delay = rand::thread_rng().gen_range(0..=max_delay_ms);
    tokio::time::sleep(Duration::from_millis(delay)).await;
}
