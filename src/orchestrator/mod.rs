//! Orchestrator - scrape and discovery runs
//!
//! This module composes the platform stages into complete runs:
//! - Launching the agent with every target of the run
//! - Waiting for the container under the runtime ceiling
//! - Locating, downloading and checking the output
//! - Normalizing the output and reconciling per-entity outcomes
//!
//! A failure in launch, poll or fetch ends the run with no records and one
//! general error. A failure on one record only affects that record's entity.

pub mod companies;
pub mod discover;
pub mod request;

pub use companies::{collect_companies, process_companies};
pub use discover::DiscoveredCompany;
pub use request::{
    extract_request_items, CompaniesRequest, ExtractedItems, RequestItem, TaskId,
    UnsupportedInputError,
};

use crate::config::Config;
use crate::ledger::{ErrorEntry, ErrorLedger};
use crate::normalize::{CanonicalRecord, Normalizer};
use crate::platform::{
    Agent, AutomationPlatform, JobKind, JobLauncher, JobPoller, PhantombusterClient, PollPolicy,
    ResultFetcher, SessionContext,
};
use crate::MinerError;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;

/// Records produced by a run plus everything that went wrong
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub records: Vec<CanonicalRecord>,
    pub errors: ErrorLedger,
}

impl RunResult {
    /// Number of entities with an outcome, successful or not
    ///
    /// The general scope is not an entity and is not counted.
    pub fn outcome_count(&self) -> usize {
        self.records.len() + self.errors.entity_failures()
    }
}

/// Runs scrape and discovery jobs against the automation platform
pub struct Orchestrator {
    config: Config,
    platform: Arc<dyn AutomationPlatform>,
    policy: PollPolicy,
    cancel: Option<watch::Receiver<bool>>,
    normalizer: Normalizer,
}

impl Orchestrator {
    /// Creates an orchestrator talking to Phantombuster over HTTP
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to run
    /// * `Err(MinerError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self, MinerError> {
        let platform = Arc::new(PhantombusterClient::new(&config.platform)?);
        Ok(Self::with_platform(config, platform))
    }

    /// Creates an orchestrator on top of any platform implementation
    pub fn with_platform(config: Config, platform: Arc<dyn AutomationPlatform>) -> Self {
        let policy = PollPolicy::from(&config.polling);
        let normalizer = Normalizer::new(config.source.name.clone());

        Self {
            config,
            platform,
            policy,
            cancel: None,
            normalizer,
        }
    }

    /// Overrides the poll timing taken from the configuration
    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stops waiting on remote jobs once `cancel` turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn launcher(&self) -> JobLauncher {
        JobLauncher::new(self.platform.clone())
    }

    fn poller(&self) -> JobPoller {
        let poller = JobPoller::new(self.platform.clone(), self.policy);
        match &self.cancel {
            Some(cancel) => poller.with_cancellation(cancel.clone()),
            None => poller,
        }
    }

    fn fetcher(&self) -> ResultFetcher {
        ResultFetcher::new(
            self.platform.clone(),
            self.config.platform.storage_template.clone(),
        )
    }

    fn session(&self) -> SessionContext {
        SessionContext {
            session_cookie: self.config.platform.session_cookie.clone(),
        }
    }

    /// Scrapes every item in one remote job
    ///
    /// # Arguments
    ///
    /// * `items` - Entities and their profile URLs; entity ids must be unique
    ///
    /// # Returns
    ///
    /// The valid records and the run's error ledger. Every item ends up either as
    /// a record or as a ledger entry under its entity id, unless a general error
    /// ended the run, in which case no record is returned. A panic anywhere in the
    /// run is reported as a general error as well.
    pub async fn scrape(&self, items: &[RequestItem]) -> RunResult {
        if items.is_empty() {
            tracing::info!("Nothing to scrape");
            return RunResult::default();
        }

        let mut errors = ErrorLedger::new();
        let outcome = AssertUnwindSafe(self.run_scrape(items, &mut errors))
            .catch_unwind()
            .await;

        let records = match outcome {
            Ok(records) => records,
            Err(panic) => {
                let description = format!(
                    "An unexpected error occurred while scraping {} companies: {}",
                    items.len(),
                    panic_message(panic.as_ref())
                );
                tracing::error!("{}", description);
                errors.record_general(ErrorEntry::crawling(description));
                Vec::new()
            }
        };

        tracing::info!(
            "Scrape finished: {} records, {} errors",
            records.len(),
            errors.len()
        );
        RunResult { records, errors }
    }

    async fn run_scrape(
        &self,
        items: &[RequestItem],
        errors: &mut ErrorLedger,
    ) -> Vec<CanonicalRecord> {
        let agent = Agent::from_config(&self.config.agents, JobKind::CompanyScraper);
        let targets: Vec<String> = items.iter().map(|item| item.target.clone()).collect();
        let entity_ids: Vec<String> = items.iter().map(|item| item.entity_id.clone()).collect();

        let mut job = match self.launcher().launch(&agent, &targets, &self.session()).await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!("{}", e);
                errors.record_general(ErrorEntry::external(e.to_string()));
                return Vec::new();
            }
        };

        if !self.poller().wait(&mut job, errors).await {
            return Vec::new();
        }

        let raw = match self.fetcher().fetch_for(&agent, Some(items.len())).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("{}", e);
                errors.record_general(e.ledger_entry());
                return Vec::new();
            }
        };

        let batch = self.normalizer.normalize(&raw, &entity_ids);
        errors.extend(batch.errors);
        batch.records
    }

    /// Searches for company profiles matching `query`
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<DiscoveredCompany>)` - Every result the discovery agent returned
    /// * `Err(MinerError)` - The job could not be launched, did not finish in time,
    ///   or its output could not be retrieved or read
    pub async fn discover(&self, query: &str) -> Result<Vec<DiscoveredCompany>, MinerError> {
        let agent = Agent::from_config(&self.config.agents, JobKind::Discovery);
        let targets = vec![query.to_string()];

        let mut job = self
            .launcher()
            .launch(&agent, &targets, &self.session())
            .await?;
        self.poller().poll_until_finished(&mut job).await?;
        let raw = self.fetcher().fetch_for(&agent, None).await?;

        let companies = raw
            .iter()
            .map(DiscoveredCompany::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!("Discovered {} companies for '{}'", companies.len(), query);
        Ok(companies)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
