//! Configuration module for site-audit
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_audit::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("audit.toml")).unwrap();
//! println!("Crawl limit: {}", config.crawler.crawl_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BasicAuth, Config, CrawlerConfig, HttpConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate_seed_url;
pub(crate) use validation::validate;
