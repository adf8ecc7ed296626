//! Error types for the automation platform boundary
//!
//! Every transport failure is classified into a [`PlatformError`] as soon as it
//! leaves reqwest. The stage-specific errors ([`LaunchError`], [`PollError`],
//! [`FetchError`]) wrap it with the context of the stage that failed.

use crate::ledger::{ErrorEntry, ErrorKind};
use crate::platform::job::JobState;
use thiserror::Error;

/// A failed exchange with the automation platform or its output storage
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("HTTP status {status} from {url}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl PlatformError {
    /// Classifies a reqwest error raised while talking to `url`
    pub fn classify(url: &str, err: reqwest::Error) -> Self {
        let url = url.to_string();
        if err.is_timeout() {
            Self::Timeout { url }
        } else if err.is_connect() {
            Self::Connect {
                url,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url,
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            Self::Decode {
                url,
                message: err.to_string(),
            }
        } else {
            Self::Network {
                url,
                message: err.to_string(),
            }
        }
    }
}

/// Failure to start a remote job
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("No targets supplied for agent {agent_id}")]
    NoTargets { agent_id: String },

    #[error("Failed to launch agent {agent_id}: {source}")]
    Platform {
        agent_id: String,
        #[source]
        source: PlatformError,
    },
}

/// Failure to see a remote job through to completion
#[derive(Debug, Error)]
pub enum PollError {
    #[error(
        "Maximum runtime of {limit_secs} seconds reached while waiting for container {container_id}"
    )]
    TimedOut { container_id: String, limit_secs: u64 },

    #[error("Polling of container {container_id} was cancelled")]
    Cancelled { container_id: String },

    #[error("Container {container_id} is already {state}")]
    AlreadyTerminal { container_id: String, state: JobState },
}

impl PollError {
    /// Converts the error into its general-scope ledger entry
    pub fn ledger_entry(&self) -> ErrorEntry {
        match self {
            Self::TimedOut { .. } => ErrorEntry::external(self.to_string()),
            Self::Cancelled { .. } | Self::AlreadyTerminal { .. } => {
                ErrorEntry::crawling(self.to_string())
            }
        }
    }
}

/// Failure to locate, retrieve or accept the output of a finished job
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to fetch output metadata for agent {agent_id}: {source}")]
    Metadata {
        agent_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("Output metadata for agent {agent_id} is missing '{field}'")]
    MissingMetadata {
        agent_id: String,
        field: &'static str,
    },

    #[error("Resolved output location '{location}' is not a valid URL: {source}")]
    InvalidLocation {
        location: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to retrieve agent output: {source}")]
    Retrieval {
        #[source]
        source: PlatformError,
    },

    #[error(
        "Output cardinality mismatch: requested {expected} companies but the agent returned {actual} records"
    )]
    Cardinality { expected: usize, actual: usize },
}

impl FetchError {
    /// Ledger classification of this failure
    ///
    /// A cardinality mismatch means the platform answered but the answer cannot be
    /// paired safely, which is reported as our own crawling error.
    pub fn ledger_kind(&self) -> ErrorKind {
        match self {
            Self::Cardinality { .. } => ErrorKind::CrawlingError,
            _ => ErrorKind::CrawlingExternalError,
        }
    }

    pub fn ledger_entry(&self) -> ErrorEntry {
        ErrorEntry::new(self.ledger_kind(), self.to_string())
    }
}
