//! Integration tests for scrape and discovery runs
//!
//! These tests use wiremock to stand in for the automation platform and its
//! output storage, and run the orchestrator over real HTTP.

mod common;

use common::*;
use company_miner::ledger::{ErrorKind, GENERAL_SCOPE};
use company_miner::orchestrator::RequestItem;
use company_miner::MinerError;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn acme_item() -> Vec<RequestItem> {
    vec![RequestItem::new("c1", "https://www.linkedin.com/company/acme")]
}

#[tokio::test]
async fn test_scrape_single_company() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/agents/launch"))
        .and(body_json(json!({
            "id": SCRAPER_AGENT,
            "argument": {
                "companies": ["https://www.linkedin.com/company/acme"],
                "sessionCookie": "li_at=abc",
                "csvName": "companies"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"containerId": "4242"})))
        .expect(1)
        .mount(&platform)
        .await;
    mount_finished(&platform).await;
    mount_metadata(&platform, SCRAPER_AGENT).await;
    mount_output(
        &platform,
        json!([{
            "name": "Acme",
            "companyUrl": "https://www.linkedin.com/company/acme",
            "industry": "Manufacturing",
            "followerCount": 1200,
            "employeesOnLinkedIn": "85",
            "mainCompanyID": 987654,
            "specialties": ["Anvils", "Rockets"],
            "timestamp": "2024-01-08T12:34:56.789Z"
        }]),
    )
    .await;

    let result = create_orchestrator(&platform, &analytics)
        .scrape(&acme_item())
        .await;

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert_eq!(record.id, "c1");
    assert_eq!(record.data_source, "linkedin");
    assert_eq!(record.name.as_deref(), Some("Acme"));
    assert_eq!(record.follower_count, Some(1200));
    assert_eq!(record.employee_count, Some(85));
    assert_eq!(record.company_id, Some(987654));
    assert_eq!(record.specialities.as_deref(), Some("Anvils, Rockets"));
    assert!(record.timestamp.is_some());
}

#[tokio::test]
async fn test_scrape_preserves_positional_pairing() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(
        &platform,
        SCRAPER_AGENT,
        json!([{"name": "Alpha"}, {"name": "Beta", "followerCount": "n/a"}, {"name": "Gamma"}]),
    )
    .await;

    let items = vec![
        RequestItem::new("x", "https://www.linkedin.com/company/alpha"),
        RequestItem::new("y", "https://www.linkedin.com/company/beta"),
        RequestItem::new("z", "https://www.linkedin.com/company/gamma"),
    ];
    let result = create_orchestrator(&platform, &analytics).scrape(&items).await;

    assert_eq!(result.outcome_count(), 3);
    assert_eq!(result.records[0].id, "x");
    assert_eq!(result.records[0].name.as_deref(), Some("Alpha"));
    assert_eq!(result.records[1].id, "z");
    assert_eq!(result.records[1].name.as_deref(), Some("Gamma"));
    let entry = result.errors.get("y").unwrap();
    assert_eq!(entry.error_type, ErrorKind::CrawlingError);
    assert!(entry.error_description.contains("followerCount"));
}

#[tokio::test]
async fn test_scrape_cardinality_mismatch() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(&platform, SCRAPER_AGENT, json!([])).await;

    let result = create_orchestrator(&platform, &analytics)
        .scrape(&acme_item())
        .await;

    assert!(result.records.is_empty());
    assert_eq!(result.errors.len(), 1);
    let entry = result.errors.get(GENERAL_SCOPE).unwrap();
    assert_eq!(entry.error_type, ErrorKind::CrawlingError);
    assert!(entry.error_description.contains("cardinality mismatch"));
}

#[tokio::test]
async fn test_scrape_launch_failure() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/agents/launch"))
        .respond_with(ResponseTemplate::new(500).set_body_string("agent not found"))
        .mount(&platform)
        .await;
    Mock::given(method("GET"))
        .and(path("/containers/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "finished"})))
        .expect(0)
        .mount(&platform)
        .await;

    let result = create_orchestrator(&platform, &analytics)
        .scrape(&acme_item())
        .await;

    assert!(result.records.is_empty());
    assert_eq!(result.errors.len(), 1);
    let entry = result.errors.general().unwrap();
    assert_eq!(entry.error_type, ErrorKind::CrawlingExternalError);
    assert!(entry.error_description.contains("500"));
}

#[tokio::test]
async fn test_scrape_storage_not_found() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_launch(&platform).await;
    mount_finished(&platform).await;
    mount_metadata(&platform, SCRAPER_AGENT).await;

    Mock::given(method("GET"))
        .and(path("/storage/org/folder/result.json"))
        .respond_with(ResponseTemplate::new(404).set_body_string("NoSuchKey"))
        .mount(&platform)
        .await;

    let result = create_orchestrator(&platform, &analytics)
        .scrape(&acme_item())
        .await;

    assert!(result.records.is_empty());
    assert_eq!(
        result.errors.general().unwrap().error_type,
        ErrorKind::CrawlingExternalError
    );
}

#[tokio::test]
async fn test_scrape_retries_status_errors() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_launch(&platform).await;

    // First status call fails, second reports running, third finishes
    Mock::given(method("GET"))
        .and(path("/containers/fetch"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&platform)
        .await;
    Mock::given(method("GET"))
        .and(path("/containers/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .up_to_n_times(1)
        .expect(1)
        .mount(&platform)
        .await;
    mount_finished(&platform).await;
    mount_metadata(&platform, SCRAPER_AGENT).await;
    mount_output(&platform, json!([{"name": "Acme"}])).await;

    let result = create_orchestrator(&platform, &analytics)
        .scrape(&acme_item())
        .await;

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.records.len(), 1);
}

#[tokio::test]
async fn test_scrape_maximum_runtime() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_launch(&platform).await;

    Mock::given(method("GET"))
        .and(path("/containers/fetch"))
        .and(query_param("id", CONTAINER_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "running"})))
        .mount(&platform)
        .await;
    Mock::given(method("GET"))
        .and(path("/agents/fetch"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&platform)
        .await;

    let orchestrator = create_orchestrator(&platform, &analytics)
        .with_poll_policy(fast_policy(Duration::from_millis(200)));
    let result = orchestrator.scrape(&acme_item()).await;

    assert!(result.records.is_empty());
    assert_eq!(result.errors.len(), 1);
    let entry = result.errors.general().unwrap();
    assert_eq!(entry.error_type, ErrorKind::CrawlingExternalError);
    assert!(entry.error_description.contains("Maximum runtime"));
}

#[tokio::test]
async fn test_discover() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/agents/launch"))
        .and(body_json(json!({
            "id": DISCOVERY_AGENT,
            "argument": {
                "queries": ["langfuse"],
                "csvName": "result"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"containerId": 4242})))
        .expect(1)
        .mount(&platform)
        .await;
    mount_finished(&platform).await;
    mount_metadata(&platform, DISCOVERY_AGENT).await;
    mount_output(
        &platform,
        json!([
            {"title": "Langfuse", "linkedinUrl": "https://www.linkedin.com/company/langfuse"},
            {"title": "Langfuse Community", "linkedinUrl": null}
        ]),
    )
    .await;

    let companies = create_orchestrator(&platform, &analytics)
        .discover("langfuse")
        .await
        .unwrap();

    assert_eq!(companies.len(), 2);
    assert_eq!(companies[0].name.as_deref(), Some("Langfuse"));
    assert_eq!(
        companies[0].url.as_deref(),
        Some("https://www.linkedin.com/company/langfuse")
    );
    assert_eq!(companies[1].url, None);
}

#[tokio::test]
async fn test_discover_fetch_failure() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_launch(&platform).await;
    mount_finished(&platform).await;

    Mock::given(method("GET"))
        .and(path("/agents/fetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"orgS3Folder": "org"})))
        .mount(&platform)
        .await;

    let result = create_orchestrator(&platform, &analytics)
        .discover("langfuse")
        .await;

    assert!(matches!(result, Err(MinerError::Fetch(_))));
}
