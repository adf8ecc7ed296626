//! Configuration module for Company-Miner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is built once at startup and handed to every component;
//! nothing else reads process state for endpoints or credentials.
//!
//! # Example
//!
//! ```no_run
//! use company_miner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("miner.toml")).unwrap();
//! println!("Polling ceiling: {}s", config.polling.maximum_runtime_secs);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AgentsConfig, AnalyticsConfig, Config, PlatformConfig, PollingConfig, SourceConfig,
    DEFAULT_STORAGE_TEMPLATE,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
