//! Automation platform client
//!
//! This module contains the upstream contract as an async trait and its HTTP
//! implementation:
//! - Launching an agent and obtaining its container id
//! - Reading the status of a container
//! - Reading the output metadata of an agent
//! - Downloading the raw output file
//!
//! Responses are decoded into loosely typed [`RawRecord`] maps at this boundary
//! and converted to typed records by the normalizer.

use crate::config::PlatformConfig;
use crate::platform::error::PlatformError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Header carrying the platform API key
pub const API_KEY_HEADER: &str = "X-Phantombuster-Key";

/// One element of an agent's output file, as delivered
pub type RawRecord = serde_json::Map<String, Value>;

/// Body of a launch request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchRequest {
    /// Agent to launch
    pub id: String,
    /// Arguments handed to the agent script
    pub argument: AgentArgument,
}

/// Agent script arguments
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentArgument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub companies: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_cookie: Option<String>,
    pub csv_name: String,
}

/// Container status as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Running,
    Finished,
}

impl ContainerStatus {
    /// Interprets the platform's status string
    ///
    /// Only `"finished"` ends the wait; every other value means the container is
    /// still working.
    pub fn from_api(status: &str) -> Self {
        if status.eq_ignore_ascii_case("finished") {
            Self::Finished
        } else {
            Self::Running
        }
    }
}

/// Storage folders of an agent's latest output
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputMetadata {
    #[serde(rename = "orgS3Folder")]
    pub org_s3_folder: Option<String>,
    #[serde(rename = "s3Folder")]
    pub s3_folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    #[serde(rename = "containerId")]
    container_id: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: Option<String>,
}

/// The upstream automation platform
///
/// Implementations never panic on remote failures; every failure is returned as a
/// classified [`PlatformError`].
#[async_trait]
pub trait AutomationPlatform: Send + Sync {
    /// Launches an agent and returns the id of the container running it
    async fn launch(&self, request: &LaunchRequest) -> Result<String, PlatformError>;

    /// Reads the status of a container
    async fn status(&self, container_id: &str) -> Result<ContainerStatus, PlatformError>;

    /// Reads the output metadata of an agent
    async fn fetch_metadata(&self, agent_id: &str) -> Result<OutputMetadata, PlatformError>;

    /// Downloads and decodes an output file
    async fn fetch_raw(&self, location: &Url) -> Result<Vec<RawRecord>, PlatformError>;
}

/// Builds an HTTP client for platform requests
///
/// # Arguments
///
/// * `config` - The platform configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &PlatformConfig) -> Result<Client, reqwest::Error> {
    let user_agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP client for the Phantombuster API
pub struct PhantombusterClient {
    client: Client,
    api_key: String,
    launch_endpoint: String,
    fetch_endpoint: String,
    container_endpoint: String,
    output_timeout: Duration,
}

impl PhantombusterClient {
    /// Creates a client from the platform configuration
    pub fn new(config: &PlatformConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            api_key: config.api_key.clone(),
            launch_endpoint: config.launch_endpoint.clone(),
            fetch_endpoint: config.fetch_endpoint.clone(),
            container_endpoint: config.container_endpoint.clone(),
            output_timeout: Duration::from_secs(config.output_timeout_secs),
        })
    }
}

#[async_trait]
impl AutomationPlatform for PhantombusterClient {
    async fn launch(&self, request: &LaunchRequest) -> Result<String, PlatformError> {
        let url = &self.launch_endpoint;
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PlatformError::classify(url, e))?;

        let body: LaunchResponse = read_json(url, response).await?;
        match body.container_id {
            Some(Value::String(id)) if !id.is_empty() => Ok(id),
            Some(Value::Number(id)) => Ok(id.to_string()),
            other => Err(PlatformError::Decode {
                url: url.clone(),
                message: format!("launch response has no usable containerId: {:?}", other),
            }),
        }
    }

    async fn status(&self, container_id: &str) -> Result<ContainerStatus, PlatformError> {
        let url = &self.container_endpoint;
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("id", container_id)])
            .send()
            .await
            .map_err(|e| PlatformError::classify(url, e))?;

        let body: StatusResponse = read_json(url, response).await?;
        let status = body.status.ok_or_else(|| PlatformError::Decode {
            url: url.clone(),
            message: "status response has no 'status' field".to_string(),
        })?;

        Ok(ContainerStatus::from_api(&status))
    }

    async fn fetch_metadata(&self, agent_id: &str) -> Result<OutputMetadata, PlatformError> {
        let url = &self.fetch_endpoint;
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("accept", "application/json")
            .query(&[("id", agent_id)])
            .send()
            .await
            .map_err(|e| PlatformError::classify(url, e))?;

        read_json(url, response).await
    }

    async fn fetch_raw(&self, location: &Url) -> Result<Vec<RawRecord>, PlatformError> {
        let url = location.as_str();
        let response = self
            .client
            .get(location.clone())
            .timeout(self.output_timeout)
            .send()
            .await
            .map_err(|e| PlatformError::classify(url, e))?;

        let items: Vec<Value> = read_json(url, response).await?;
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(PlatformError::Decode {
                    url: url.to_string(),
                    message: format!("output element {} is not an object: {}", index, other),
                }),
            })
            .collect()
    }
}

/// Checks the status code and decodes a JSON body
async fn read_json<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, PlatformError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(PlatformError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PlatformError::classify(url, e))?;

    serde_json::from_slice(&bytes).map_err(|e| PlatformError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}
