//! HTTP client for the analytics service

use crate::analytics::{
    AnalyticsError, AnalyticsSink, CompletionNotice, MeasurementDescriptor, RawRecordSubmission,
    SubmitAck,
};
use crate::config::AnalyticsConfig;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Analytics service reached over HTTP with bearer authentication
pub struct AnalyticsClient {
    client: Client,
    measurement_url: Url,
    feed_raw_url: Url,
    crawling_finished_url: Url,
}

impl AnalyticsClient {
    /// Creates a client for the service at `config.base_url`
    ///
    /// Endpoint paths are resolved against the root of the base URL.
    pub fn new(config: &AnalyticsConfig) -> Result<Self, AnalyticsError> {
        let base = Url::parse(&config.base_url).map_err(|source| AnalyticsError::InvalidUrl {
            url: config.base_url.clone(),
            source,
        })?;
        let endpoint = |path: &str| {
            base.join(path).map_err(|source| AnalyticsError::InvalidUrl {
                url: format!("{}{}", config.base_url, path),
                source,
            })
        };

        let client = Client::builder()
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| AnalyticsError::Request {
                url: config.base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            measurement_url: endpoint("/source-measurement")?,
            feed_raw_url: endpoint("/feed-raw-data")?,
            crawling_finished_url: endpoint("/crawling-finished")?,
        })
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &Url,
        token: &str,
        body: &T,
    ) -> Result<Response, AnalyticsError> {
        self.client
            .post(url.clone())
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|source| AnalyticsError::Request {
                url: url.to_string(),
                source,
            })
    }
}

async fn status_error(url: &Url, response: Response) -> AnalyticsError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AnalyticsError::Status {
        url: url.to_string(),
        status,
        body,
    }
}

#[async_trait]
impl AnalyticsSink for AnalyticsClient {
    async fn submit_measurement(
        &self,
        token: &str,
        measurement: &MeasurementDescriptor,
    ) -> Result<String, AnalyticsError> {
        let url = &self.measurement_url;
        let response = self.post(url, token, measurement).await?;

        if response.status() != StatusCode::CREATED {
            let err = status_error(url, response).await;
            tracing::error!("{}", err);
            return Err(err);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|source| AnalyticsError::Request {
                url: url.to_string(),
                source,
            })?;

        match body.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(AnalyticsError::MissingId {
                url: url.to_string(),
            }),
        }
    }

    async fn submit_raw_record(
        &self,
        token: &str,
        submission: &RawRecordSubmission<'_>,
    ) -> Result<SubmitAck, AnalyticsError> {
        let url = &self.feed_raw_url;
        let response = self.post(url, token, submission).await?;

        match response.status() {
            StatusCode::CREATED => Ok(SubmitAck::Accepted),
            StatusCode::NOT_FOUND => {
                tracing::debug!(
                    "Analytics does not know company {}, skipping",
                    submission.company_id
                );
                Ok(SubmitAck::NotFound)
            }
            _ => Err(status_error(url, response).await),
        }
    }

    async fn notify_run_complete(
        &self,
        token: &str,
        notice: &CompletionNotice<'_>,
    ) -> Result<(), AnalyticsError> {
        let url = &self.crawling_finished_url;
        let response = self.post(url, token, notice).await?;

        if !response.status().is_success() {
            return Err(status_error(url, response).await);
        }
        tracing::info!(
            "Reported completion of task {} with {} errors",
            notice.task_id,
            notice.errors.len()
        );
        Ok(())
    }
}
