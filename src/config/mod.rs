//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files. Every section is optional; missing values fall back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use strata_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Download workers: {}", config.crawler.downloaders);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, HttpConfig, OutputConfig, UserAgentConfig};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::{
    validate, validate_crawler_config, validate_engine_config, validate_host_pattern,
};
