//! Job poller
//!
//! Waits for a remote job to finish by polling its container status:
//! - `finished` ends the wait immediately
//! - any other status sleeps the base interval and polls again
//! - failures sleep a fixed delay chosen by failure class and poll again
//!
//! The whole wait is bounded by a runtime ceiling measured on a monotonic clock
//! from the first poll attempt. The ceiling is checked on every iteration, sleeps
//! are clamped to the remaining budget, and each status request is itself cut off
//! when the budget runs out.
//!
//! | Condition | Delay before next poll |
//! |-----------|------------------------|
//! | Not finished | base interval (10s) |
//! | HTTP status error | 20s |
//! | Request timeout | 20s |
//! | Anything else | 30s |

use crate::config::PollingConfig;
use crate::ledger::ErrorLedger;
use crate::platform::client::{AutomationPlatform, ContainerStatus};
use crate::platform::error::{PlatformError, PollError};
use crate::platform::job::{JobState, ScrapeJob};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Timing of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub base_interval: Duration,
    pub http_error_delay: Duration,
    pub timeout_delay: Duration,
    pub unexpected_error_delay: Duration,
    pub maximum_runtime: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollPolicy {
    fn from(config: &PollingConfig) -> Self {
        Self {
            base_interval: Duration::from_secs(config.base_interval_secs),
            http_error_delay: Duration::from_secs(config.http_error_delay_secs),
            timeout_delay: Duration::from_secs(config.timeout_delay_secs),
            unexpected_error_delay: Duration::from_secs(config.unexpected_error_delay_secs),
            maximum_runtime: Duration::from_secs(config.maximum_runtime_secs),
        }
    }
}

impl PollPolicy {
    /// Delay to apply after a failed status request of the given class
    pub fn delay_for(&self, class: FailureClass) -> Duration {
        match class {
            FailureClass::HttpStatus => self.http_error_delay,
            FailureClass::Timeout => self.timeout_delay,
            FailureClass::Unexpected => self.unexpected_error_delay,
        }
    }
}

/// Failure classes of a status request, each with its own retry delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    HttpStatus,
    Timeout,
    Unexpected,
}

impl FailureClass {
    pub fn of(error: &PlatformError) -> Self {
        match error {
            PlatformError::Status { .. } => Self::HttpStatus,
            PlatformError::Timeout { .. } => Self::Timeout,
            PlatformError::Connect { .. }
            | PlatformError::Network { .. }
            | PlatformError::Decode { .. } => Self::Unexpected,
        }
    }
}

/// Polls remote jobs until they finish or the ceiling is reached
pub struct JobPoller {
    platform: Arc<dyn AutomationPlatform>,
    policy: PollPolicy,
    cancel: Option<watch::Receiver<bool>>,
}

impl JobPoller {
    pub fn new(platform: Arc<dyn AutomationPlatform>, policy: PollPolicy) -> Self {
        Self {
            platform,
            policy,
            cancel: None,
        }
    }

    /// Stops waiting as soon as `cancel` turns true
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Waits for `job` to finish, recording a general error on failure
    ///
    /// # Returns
    ///
    /// * `true` - The job reached `Finished`
    /// * `false` - The ceiling was reached or the wait was cancelled; the reason is
    ///   recorded in `ledger` under the general scope
    pub async fn wait(&self, job: &mut ScrapeJob, ledger: &mut ErrorLedger) -> bool {
        match self.poll_until_finished(job).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("{}", e);
                ledger.record_general(e.ledger_entry());
                false
            }
        }
    }

    /// Polls until `job` finishes
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The job is `Finished`
    /// * `Err(PollError::TimedOut)` - The ceiling elapsed; the job is `TimedOut`
    /// * `Err(PollError::Cancelled)` - Cancellation was requested; the job is `Failed`
    /// * `Err(PollError::AlreadyTerminal)` - The job had already ended unsuccessfully
    pub async fn poll_until_finished(&self, job: &mut ScrapeJob) -> Result<(), PollError> {
        let container_id = job.handle().as_str().to_string();

        let state = job.state();
        if state.is_success() {
            return Ok(());
        }
        if state.is_terminal() {
            return Err(PollError::AlreadyTerminal {
                container_id,
                state,
            });
        }

        let ceiling = self.policy.maximum_runtime;
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            let elapsed = started.elapsed();
            if elapsed >= ceiling {
                self.set_state(job, JobState::TimedOut);
                return Err(PollError::TimedOut {
                    container_id,
                    limit_secs: ceiling.as_secs(),
                });
            }

            if self.is_cancelled() {
                self.set_state(job, JobState::Failed);
                return Err(PollError::Cancelled { container_id });
            }

            attempts += 1;
            let remaining = ceiling - elapsed;

            let delay = match tokio::time::timeout(remaining, self.platform.status(&container_id))
                .await
            {
                Ok(Ok(ContainerStatus::Finished)) => {
                    self.set_state(job, JobState::Finished);
                    tracing::info!(
                        "Container {} finished after {} polls in {:?}",
                        container_id,
                        attempts,
                        started.elapsed()
                    );
                    return Ok(());
                }
                Ok(Ok(ContainerStatus::Running)) => {
                    self.set_state(job, JobState::Running);
                    tracing::debug!(
                        "Container {} still running (poll {}), checking again in {:?}",
                        container_id,
                        attempts,
                        self.policy.base_interval
                    );
                    self.policy.base_interval
                }
                Ok(Err(e)) => {
                    let class = FailureClass::of(&e);
                    let delay = self.policy.delay_for(class);
                    match class {
                        FailureClass::HttpStatus => tracing::error!(
                            "HTTP status error while getting container status: {}. Retrying in {:?}",
                            e,
                            delay
                        ),
                        FailureClass::Timeout => tracing::warn!(
                            "Timeout while getting container status. Retrying in {:?}",
                            delay
                        ),
                        FailureClass::Unexpected => tracing::error!(
                            "Unexpected error while getting container status: {}. Retrying in {:?}",
                            e,
                            delay
                        ),
                    }
                    delay
                }
                Err(_) => {
                    // Status request outlived the remaining budget
                    tracing::warn!(
                        "Status request for container {} cut off at the runtime ceiling",
                        container_id
                    );
                    continue;
                }
            };

            let remaining = ceiling.saturating_sub(started.elapsed());
            self.pause(delay.min(remaining)).await;
        }
    }

    /// Sleeps for `delay`, waking early on cancellation
    async fn pause(&self, delay: Duration) {
        let Some(cancel) = &self.cancel else {
            tokio::time::sleep(delay).await;
            return;
        };

        let mut cancel = cancel.clone();
        let sender_alive = tokio::select! {
            _ = tokio::time::sleep(delay) => return,
            changed = cancel.wait_for(|cancelled| *cancelled) => changed.is_ok(),
        };

        if !sender_alive {
            // Sender dropped, cancellation can no longer happen
            tokio::time::sleep(delay).await;
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|cancel| *cancel.borrow())
            .unwrap_or(false)
    }

    fn set_state(&self, job: &mut ScrapeJob, next: JobState) {
        if let Err(e) = job.transition(next) {
            tracing::warn!("Ignoring state change for container {}: {}", job.handle(), e);
        }
    }
}
