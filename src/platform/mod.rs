//! Automation platform integration
//!
//! This module contains everything that talks to the browser-automation platform:
//! - The platform contract and its HTTP client
//! - Launching agents
//! - Polling containers until they finish
//! - Locating and downloading agent output

pub mod client;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod launcher;
pub mod poller;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    build_http_client, AgentArgument, AutomationPlatform, ContainerStatus, LaunchRequest,
    OutputMetadata, PhantombusterClient, RawRecord, API_KEY_HEADER,
};
pub use error::{FetchError, LaunchError, PlatformError, PollError};
pub use fetcher::{check_cardinality, render_storage_location, ResultFetcher};
pub use job::{JobHandle, JobState, ScrapeJob};
pub use launcher::{build_launch_request, Agent, JobKind, JobLauncher, SessionContext};
pub use poller::{FailureClass, JobPoller, PollPolicy};
