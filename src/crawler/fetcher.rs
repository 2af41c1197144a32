//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent, timeout and redirect limit
//! - GET and HEAD requests with optional basic auth
//! - Time-to-first-byte measurement
//! - Classifying transport failures
//!
//! Any HTTP status is a normal response. Only transport failures (timeout,
//! connection errors, DNS errors, redirect overflow) are errors. Nothing is
//! retried: a failure is final for that URL.

use crate::config::{BasicAuth, HttpConfig};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client, RequestBuilder};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use url::Url;

/// HTTP method of a frontier item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Head => write!(f, "HEAD"),
        }
    }
}

/// Transport-level fetch failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// Returns true if the request timed out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body (empty for HEAD)
    pub body: String,
    /// URL after following redirects
    pub final_url: Url,
    /// Time between sending the request and receiving the response head
    pub ttfb: Duration,
}

impl FetchResponse {
    /// The raw Content-Type header, if present and valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns true if the Content-Type is HTML
    pub fn is_html(&self) -> bool {
        self.content_type()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }

    /// TTFB in whole milliseconds
    pub fn ttfb_millis(&self) -> u64 {
        self.ttfb.as_millis() as u64
    }
}

/// Builds an HTTP client from the HTTP configuration
///
/// # Example
///
/// ```no_run
/// use site_audit::config::HttpConfig;
/// use site_audit::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::with_user_agent("SiteAuditBot/1.0")).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let redirect = if config.max_redirects == 0 {
        Policy::none()
    } else {
        Policy::limited(config.max_redirects)
    };

    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Stateless fetch client shared by all crawl workers
///
/// Cloning is cheap: the underlying connection pool is reference counted.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    basic_auth: Option<BasicAuth>,
}

impl FetchClient {
    /// Creates a fetch client from the HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            basic_auth: config.basic_auth.clone(),
        })
    }

    /// Issues a GET request and reads the body
    pub async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.fetch(url, HttpMethod::Get).await
    }

    /// Issues a HEAD request
    pub async fn head(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.fetch(url, HttpMethod::Head).await
    }

    /// Issues a request with the given method
    pub async fn fetch(&self, url: &str, method: HttpMethod) -> Result<FetchResponse, FetchError> {
        let request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Head => self.client.head(url),
        };
        let request = self.with_auth(request);

        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let ttfb = start.elapsed();

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let final_url = response.url().clone();

        let body = match method {
            HttpMethod::Get => response
                .text()
                .await
                .map_err(|e| FetchError::from_reqwest(url, e))?,
            HttpMethod::Head => String::new(),
        };

        tracing::trace!("{} {} -> {} in {:?}", method, url, status, ttfb);

        Ok(FetchResponse {
            status,
            headers,
            body,
            final_url,
            ttfb,
        })
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.basic_auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        }
    }
}
