//! Analytics sink
//!
//! The downstream analytics service receives three kinds of messages:
//! - Measurement registrations, once per source module
//! - Raw data for every canonical record a run produced
//! - A completion notice carrying the run's error ledger
//!
//! Tokens are passed through untouched; this crate never inspects them.

pub mod client;
pub mod normalization;

pub use client::AnalyticsClient;
pub use normalization::{register_measurements, FieldMapping, NormalizationMap};

use crate::ledger::ErrorLedger;
use crate::normalize::CanonicalRecord;
use crate::orchestrator::TaskId;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Failure to deliver a message to the analytics service
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Invalid analytics URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Analytics request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Analytics request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Analytics response from {url} has no usable measurement id")]
    MissingId { url: String },
}

/// A measurement to register for a source module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasurementDescriptor {
    pub source_module_id: Option<String>,
    #[serde(rename = "type")]
    pub data_type: String,
    pub measurement_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_measurement_id: Option<String>,
}

/// One canonical record as forwarded to analytics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecordSubmission<'a> {
    pub source_name: &'a str,
    pub company_id: &'a str,
    pub raw_data: &'a CanonicalRecord,
}

impl<'a> RawRecordSubmission<'a> {
    pub fn from_record(record: &'a CanonicalRecord) -> Self {
        Self {
            source_name: &record.data_source,
            company_id: &record.id,
            raw_data: record,
        }
    }
}

/// Analytics answer to a raw record submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAck {
    Accepted,
    /// The company is unknown to analytics; not an error
    NotFound,
}

/// End-of-run notice carrying every error of the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionNotice<'a> {
    pub task_id: &'a TaskId,
    pub errors: &'a ErrorLedger,
}

/// The downstream analytics service
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Registers a measurement and returns the id analytics assigned to it
    async fn submit_measurement(
        &self,
        token: &str,
        measurement: &MeasurementDescriptor,
    ) -> Result<String, AnalyticsError>;

    /// Forwards one canonical record
    async fn submit_raw_record(
        &self,
        token: &str,
        submission: &RawRecordSubmission<'_>,
    ) -> Result<SubmitAck, AnalyticsError>;

    /// Reports that a run has finished
    async fn notify_run_complete(
        &self,
        token: &str,
        notice: &CompletionNotice<'_>,
    ) -> Result<(), AnalyticsError>;
}
