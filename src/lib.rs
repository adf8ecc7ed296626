//! Company-Miner: company profile mining through a browser-automation platform
//!
//! This crate launches remote scraping agents, waits for them under a time budget,
//! retrieves and validates their output, and reconciles per-company success and
//! failure into a partial result that can be forwarded to an analytics service.

pub mod analytics;
pub mod config;
pub mod ledger;
pub mod normalize;
pub mod orchestrator;
pub mod platform;

use thiserror::Error;

/// Main error type for Company-Miner operations
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Launch error: {0}")]
    Launch(#[from] platform::LaunchError),

    #[error("Polling error: {0}")]
    Poll(#[from] platform::PollError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] platform::FetchError),

    #[error("Platform error: {0}")]
    Platform(#[from] platform::PlatformError),

    #[error("Validation error: {0}")]
    Validation(#[from] normalize::ValidationError),

    #[error("Unsupported input: {0}")]
    UnsupportedInput(#[from] orchestrator::UnsupportedInputError),

    #[error("Analytics error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid job state transition: {from} -> {to}")]
    InvalidTransition {
        from: platform::JobState,
        to: platform::JobState,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Company-Miner operations
pub type Result<T> = std::result::Result<T, MinerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use ledger::{ErrorEntry, ErrorKind, ErrorLedger, GENERAL_SCOPE};
pub use normalize::{CanonicalRecord, Normalizer};
pub use orchestrator::{Orchestrator, RequestItem, RunResult};
pub use platform::{JobState, PhantombusterClient, ScrapeJob};
