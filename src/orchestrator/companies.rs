//! Companies pipeline
//!
//! Runs an inbound companies request end to end: extract one target per entity,
//! scrape them in a single run, forward every record to analytics, then report
//! completion together with the run's error ledger.

use crate::analytics::{
    AnalyticsError, AnalyticsSink, CompletionNotice, RawRecordSubmission, SubmitAck,
};
use crate::ledger::{ErrorEntry, ErrorKind};
use crate::orchestrator::request::{extract_request_items, CompaniesRequest};
use crate::orchestrator::{Orchestrator, RunResult};

/// Scrapes every usable company of `request`
///
/// Entities without a usable target are recorded as unsupported input and never
/// submitted to the platform.
pub async fn collect_companies(orchestrator: &Orchestrator, request: &CompaniesRequest) -> RunResult {
    let extracted = extract_request_items(request, &orchestrator.config().source);

    let mut result = orchestrator.scrape(&extracted.items).await;
    extracted.record_rejections(&mut result.errors);
    result
}

/// Scrapes `request` and forwards the outcome to analytics
///
/// # Arguments
///
/// * `orchestrator` - Runs the scrape
/// * `sink` - The analytics service
/// * `token` - Bearer token for analytics, passed through untouched
/// * `request` - The inbound companies request
///
/// # Returns
///
/// * `Ok(RunResult)` - The run's records and ledger. A record analytics refused
///   is moved into the ledger, so every entity still has exactly one outcome
/// * `Err(AnalyticsError)` - The completion notice could not be delivered
pub async fn process_companies(
    orchestrator: &Orchestrator,
    sink: &dyn AnalyticsSink,
    token: &str,
    request: &CompaniesRequest,
) -> Result<RunResult, AnalyticsError> {
    let mut result = collect_companies(orchestrator, request).await;

    let scraped = std::mem::take(&mut result.records);
    let total = scraped.len();
    let mut delivered = 0;
    for record in scraped {
        let outcome = sink
            .submit_raw_record(token, &RawRecordSubmission::from_record(&record))
            .await;
        match outcome {
            Ok(SubmitAck::Accepted) => {
                delivered += 1;
                result.records.push(record);
            }
            Ok(SubmitAck::NotFound) => result.records.push(record),
            Err(e) => {
                tracing::error!("Failed to forward company {}: {}", record.id, e);
                result.errors.record(
                    record.id,
                    ErrorEntry::new(ErrorKind::AnalyticsError, e.to_string()),
                );
            }
        }
    }
    tracing::info!(
        "Forwarded {} of {} records for task {}",
        delivered,
        total,
        request.task_id
    );

    sink.notify_run_complete(
        token,
        &CompletionNotice {
            task_id: &request.task_id,
            errors: &result.errors,
        },
    )
    .await?;

    Ok(result)
}
