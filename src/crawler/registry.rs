//! Registry of running crawls, keyed by project
//!
//! Owned by whatever starts crawls (the CLI, a server). At most one active
//! crawl per project; a finished crawl's slot is reused by the next start.

use crate::config::Config;
use crate::crawler::coordinator::{CrawlHandle, Crawler};
use crate::crawler::events::CrawlEvent;
use crate::crawler::lock;
use crate::state::{CrawlPhase, CrawlStatus};
use crate::{AuditError, Result};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use url::Url;

#[derive(Debug, Default)]
pub struct CrawlRegistry {
    crawls: Mutex<HashMap<i64, CrawlHandle>>,
}

impl CrawlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a crawl for the project on a new tokio task
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    ///
    /// * `Ok(receiver)` - The crawl's event stream; it ends after the
    ///   `Completed` or `Error` event
    /// * `Err(AuditError::AlreadyRunning)` - The project has an active crawl
    pub fn start(
        &self,
        project_id: i64,
        seed: Url,
        config: &Config,
    ) -> Result<UnboundedReceiver<CrawlEvent>> {
        let mut crawls = lock(&self.crawls);

        if crawls.get(&project_id).is_some_and(CrawlHandle::is_running) {
            return Err(AuditError::AlreadyRunning { project_id });
        }

        let crawler = Crawler::new(seed, config)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let (handle, _task) = crawler.spawn(tx)?;
        crawls.insert(project_id, handle);

        tracing::info!("Started crawl for project {}", project_id);
        Ok(rx)
    }

    /// Requests a stop; returns false if the project has no running crawl
    pub fn stop(&self, project_id: i64) -> bool {
        lock(&self.crawls)
            .get(&project_id)
            .map(CrawlHandle::stop)
            .unwrap_or(false)
    }

    /// Latest counters of the project's most recent crawl
    pub fn status(&self, project_id: i64) -> Option<CrawlStatus> {
        lock(&self.crawls).get(&project_id).map(CrawlHandle::status)
    }

    pub fn phase(&self, project_id: i64) -> Option<CrawlPhase> {
        lock(&self.crawls).get(&project_id).map(CrawlHandle::phase)
    }

    pub fn is_running(&self, project_id: i64) -> bool {
        lock(&self.crawls)
            .get(&project_id)
            .is_some_and(CrawlHandle::is_running)
    }
}
