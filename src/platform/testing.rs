//! Scripted in-memory platform for unit tests

use crate::platform::client::{
    AutomationPlatform, ContainerStatus, LaunchRequest, OutputMetadata, RawRecord,
};
use crate::platform::error::PlatformError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

/// Platform double whose answers are set up front
///
/// Status answers are served from a script; once the script is exhausted every
/// further call returns the fallback status.
pub(crate) struct ScriptedPlatform {
    launch_error: Option<PlatformError>,
    statuses: Mutex<VecDeque<Result<ContainerStatus, PlatformError>>>,
    fallback_status: ContainerStatus,
    status_delay: Duration,
    metadata: Result<OutputMetadata, PlatformError>,
    output: Result<Vec<RawRecord>, PlatformError>,
    panic_on_fetch: bool,
    launch_requests: Mutex<Vec<LaunchRequest>>,
    status_calls: AtomicUsize,
    fetched_locations: Mutex<Vec<Url>>,
}

impl ScriptedPlatform {
    pub const CONTAINER_ID: &'static str = "container-1";

    /// A platform that launches, finishes immediately and returns no records
    pub fn new() -> Self {
        Self {
            launch_error: None,
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: ContainerStatus::Finished,
            status_delay: Duration::ZERO,
            metadata: Ok(OutputMetadata {
                org_s3_folder: Some("org".to_string()),
                s3_folder: Some("folder".to_string()),
            }),
            output: Ok(Vec::new()),
            panic_on_fetch: false,
            launch_requests: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            fetched_locations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_launch_error(mut self, error: PlatformError) -> Self {
        self.launch_error = Some(error);
        self
    }

    pub fn with_statuses(self, statuses: Vec<Result<ContainerStatus, PlatformError>>) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    /// Reports `Running` forever once the script is exhausted
    pub fn never_finishing(mut self) -> Self {
        self.fallback_status = ContainerStatus::Running;
        self
    }

    /// Makes every status call take `delay` before answering
    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn with_metadata(mut self, metadata: Result<OutputMetadata, PlatformError>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_output(mut self, records: Vec<RawRecord>) -> Self {
        self.output = Ok(records);
        self
    }

    pub fn with_output_error(mut self, error: PlatformError) -> Self {
        self.output = Err(error);
        self
    }

    pub fn panicking_on_fetch(mut self) -> Self {
        self.panic_on_fetch = true;
        self
    }

    pub fn launch_requests(&self) -> Vec<LaunchRequest> {
        self.launch_requests.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn fetched_locations(&self) -> Vec<Url> {
        self.fetched_locations.lock().unwrap().clone()
    }
}

#[async_trait]
impl AutomationPlatform for ScriptedPlatform {
    async fn launch(&self, request: &LaunchRequest) -> Result<String, PlatformError> {
        self.launch_requests.lock().unwrap().push(request.clone());
        match &self.launch_error {
            Some(error) => Err(error.clone()),
            None => Ok(Self::CONTAINER_ID.to_string()),
        }
    }

    async fn status(&self, _container_id: &str) -> Result<ContainerStatus, PlatformError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let next = self.statuses.lock().unwrap().pop_front();
        next.unwrap_or(Ok(self.fallback_status))
    }

    async fn fetch_metadata(&self, _agent_id: &str) -> Result<OutputMetadata, PlatformError> {
        self.metadata.clone()
    }

    async fn fetch_raw(&self, location: &Url) -> Result<Vec<RawRecord>, PlatformError> {
        self.fetched_locations.lock().unwrap().push(location.clone());
        if self.panic_on_fetch {
            panic!("storage client exploded");
        }
        self.output.clone()
    }
}

/// Builds a raw record from a JSON object literal
pub(crate) fn raw(value: serde_json::Value) -> RawRecord {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}
