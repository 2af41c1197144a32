//! Robots.txt handling module
//!
//! This module fetches and parses the seed host's robots.txt once per
//! crawl. Any failure degrades to an allow-everything policy so that a
//! broken robots.txt can never stop a crawl from discovering URLs.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::FetchClient;
use url::Url;

/// Fetches robots.txt for the seed URL's origin
///
/// Issues one GET to `{scheme}://{host}[:port]/robots.txt`. HTTP 200 yields
/// a parsed policy; any other status, a timeout or a network error yields
/// [`ParsedRobots::allow_all`], which reports `exists() == false`.
///
/// # Arguments
///
/// * `client` - The fetch client
/// * `seed` - Any URL on the crawled origin
/// * `user_agent` - The configured user agent string
pub async fn fetch_robots(client: &FetchClient, seed: &Url, user_agent: &str) -> ParsedRobots {
    let robots_url = match seed.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", seed, e);
            return ParsedRobots::allow_all();
        }
    };

    match client.get(robots_url.as_str()).await {
        Ok(response) if response.status == 200 => {
            let robots = ParsedRobots::from_content(&response.body, user_agent);
            tracing::info!(
                "Loaded {} ({} allow, {} disallow rules, {} sitemaps)",
                robots_url,
                robots.allow_rules().len(),
                robots.disallow_rules().len(),
                robots.sitemaps().len()
            );
            robots
        }
        Ok(response) => {
            tracing::info!(
                "No robots.txt at {} (HTTP {}), allowing everything",
                robots_url,
                response.status
            );
            ParsedRobots::allow_all()
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}, allowing everything", robots_url, e);
            ParsedRobots::allow_all()
        }
    }
}
