//! Job launcher
//!
//! Submits a scrape or discovery request to the automation platform. Every
//! failure comes back as a [`LaunchError`]; nothing is retried here.

use crate::config::AgentsConfig;
use crate::platform::client::{AgentArgument, AutomationPlatform, LaunchRequest};
use crate::platform::error::LaunchError;
use crate::platform::job::{JobHandle, ScrapeJob};
use std::sync::Arc;

/// What an agent does, which decides the shape of its arguments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Scrapes one profile per target URL
    CompanyScraper,
    /// Searches for profiles matching free-text queries
    Discovery,
}

impl JobKind {
    /// Name of the CSV the agent writes next to its JSON output
    fn csv_name(&self) -> &'static str {
        match self {
            Self::CompanyScraper => "companies",
            Self::Discovery => "result",
        }
    }
}

/// An agent on the platform together with where it writes its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub kind: JobKind,
    pub output_filename: String,
}

impl Agent {
    /// Selects the configured agent for `kind`
    pub fn from_config(config: &AgentsConfig, kind: JobKind) -> Self {
        let id = match kind {
            JobKind::CompanyScraper => config.company_scraper.clone(),
            JobKind::Discovery => config.discovery.clone(),
        };

        Self {
            id,
            kind,
            output_filename: config.output_filename.clone(),
        }
    }
}

/// Credentials the remote automation needs to act on the user's behalf
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub session_cookie: Option<String>,
}

/// Builds the launch payload for an agent
///
/// The session cookie is only handed to the company scraper; discovery runs
/// against public search results.
pub fn build_launch_request(
    agent: &Agent,
    targets: &[String],
    session: &SessionContext,
) -> LaunchRequest {
    let argument = match agent.kind {
        JobKind::CompanyScraper => AgentArgument {
            companies: Some(targets.to_vec()),
            queries: None,
            session_cookie: session.session_cookie.clone(),
            csv_name: agent.kind.csv_name().to_string(),
        },
        JobKind::Discovery => AgentArgument {
            companies: None,
            queries: Some(targets.to_vec()),
            session_cookie: None,
            csv_name: agent.kind.csv_name().to_string(),
        },
    };

    LaunchRequest {
        id: agent.id.clone(),
        argument,
    }
}

/// Starts remote jobs
pub struct JobLauncher {
    platform: Arc<dyn AutomationPlatform>,
}

impl JobLauncher {
    pub fn new(platform: Arc<dyn AutomationPlatform>) -> Self {
        Self { platform }
    }

    /// Launches `agent` over `targets`
    ///
    /// # Arguments
    ///
    /// * `agent` - The agent to launch
    /// * `targets` - Ordered, non-empty list of target URLs or queries
    /// * `session` - Credentials for the remote automation
    ///
    /// # Returns
    ///
    /// * `Ok(ScrapeJob)` - The platform accepted the launch; the job is `Launched`
    /// * `Err(LaunchError)` - No targets, or the platform could not be reached or refused
    pub async fn launch(
        &self,
        agent: &Agent,
        targets: &[String],
        session: &SessionContext,
    ) -> Result<ScrapeJob, LaunchError> {
        if targets.is_empty() {
            return Err(LaunchError::NoTargets {
                agent_id: agent.id.clone(),
            });
        }

        let request = build_launch_request(agent, targets, session);
        tracing::info!(
            "Launching agent {} ({:?}) with {} targets",
            agent.id,
            agent.kind,
            targets.len()
        );

        let container_id =
            self.platform
                .launch(&request)
                .await
                .map_err(|source| LaunchError::Platform {
                    agent_id: agent.id.clone(),
                    source,
                })?;

        tracing::info!("Agent {} started in container {}", agent.id, container_id);
        Ok(ScrapeJob::new(JobHandle::new(container_id), agent.id.clone()))
    }
}
