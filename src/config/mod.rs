//! Configuration module
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use wp_ingest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("wp-ingest.toml")).unwrap();
//! println!("Ingesting from: {}", config.remote.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, LastPageConfig, RemoteConfig, RetryConfig, ScheduleConfig, ScrapeConfig,
    StorageConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
