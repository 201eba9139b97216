//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use nrl_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Fetch slots: {}", config.crawler.max_concurrent_fetches);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, DatabaseConfig, FetcherConfig, FetcherMode, OutputConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
