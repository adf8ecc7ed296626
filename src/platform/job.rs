/// Remote job handle and lifecycle states
///
/// A job is created by the launcher in the `Launched` state and then moved along by
/// the poller only. Once it reaches a terminal state it never changes again.
use crate::MinerError;
use std::fmt;

/// Represents the current state of a remote scraping job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    // ===== Active States =====
    /// Launch request accepted, no status observed yet
    Launched,

    /// Platform reported the container as not finished
    Running,

    // ===== Terminal States =====
    /// Platform reported the container as finished
    Finished,

    /// Waiting was abandoned (cancelled)
    Failed,

    /// The runtime ceiling elapsed before the container finished
    TimedOut,
}

impl JobState {
    /// Returns true if this is a terminal state (no further polling)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::TimedOut)
    }

    /// Returns true if this is an active state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Launched | Self::Running)
    }

    /// Returns true if the job finished and its output can be fetched
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Returns true if the job may move from this state to `next`
    ///
    /// Active states may move to any state except back to `Launched`.
    /// Terminal states accept no transition.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        self.is_active() && next != Self::Launched
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Launched => "launched",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Returns all possible job states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Launched,
            Self::Running,
            Self::Finished,
            Self::Failed,
            Self::TimedOut,
        ]
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque reference to a remote container run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self(container_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A launched remote job and the state last inferred for it
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    handle: JobHandle,
    agent_id: String,
    state: JobState,
}

impl ScrapeJob {
    /// Creates a job in the `Launched` state
    pub fn new(handle: JobHandle, agent_id: impl Into<String>) -> Self {
        Self {
            handle,
            agent_id: agent_id.into(),
            state: JobState::Launched,
        }
    }

    pub fn handle(&self) -> &JobHandle {
        &self.handle
    }

    /// The agent whose container this job is
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Moves the job to `next`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The transition was applied
    /// * `Err(MinerError::InvalidTransition)` - The current state does not allow it
    pub(crate) fn transition(&mut self, next: JobState) -> Result<(), MinerError> {
        if !self.state.can_transition_to(next) {
            return Err(MinerError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}
