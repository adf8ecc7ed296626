//! Integration tests for the analytics side of the pipeline
//!
//! Both the automation platform and the analytics service are wiremock servers.

mod common;

use common::*;
use company_miner::analytics::{
    register_measurements, AnalyticsClient, AnalyticsError, FieldMapping, NormalizationMap,
};
use company_miner::ledger::ErrorKind;
use company_miner::orchestrator::{process_companies, CompaniesRequest};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "analytics-token";

fn companies_request() -> CompaniesRequest {
    serde_json::from_value(json!({
        "task_id": 123,
        "companies": {
            "Example_id1": {
                "name": ["langfuse"],
                "url": ["www.linkedin.com/company/langfuse"]
            },
            "Example_id2": {
                "name": ["personio"],
                "url": ["www.linkedin.com/company/personio"]
            },
            "Example_id3": {
                "name": ["unknown"],
                "domain": ["unknown.example"]
            }
        }
    }))
    .unwrap()
}

fn two_companies() -> Value {
    json!([
        {"name": "Langfuse", "companyUrl": "https://www.linkedin.com/company/langfuse"},
        {"name": "Personio", "companyUrl": "https://www.linkedin.com/company/personio"}
    ])
}

async fn mount_crawling_finished(analytics: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/crawling-finished"))
        .and(header("authorization", "Bearer analytics-token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(analytics)
        .await;
}

async fn crawling_finished_body(analytics: &MockServer) -> Value {
    let requests = analytics.received_requests().await.unwrap();
    let request = requests
        .iter()
        .find(|r| r.url.path() == "/crawling-finished")
        .expect("crawling-finished was not called");
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn test_full_pipeline() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(&platform, SCRAPER_AGENT, two_companies()).await;

    Mock::given(method("POST"))
        .and(path("/feed-raw-data"))
        .and(header("authorization", "Bearer analytics-token"))
        .and(body_partial_json(json!({"source_name": "linkedin"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"status": "ok"})))
        .expect(2)
        .mount(&analytics)
        .await;
    mount_crawling_finished(&analytics).await;

    let orchestrator = create_orchestrator(&platform, &analytics);
    let client = AnalyticsClient::new(&orchestrator.config().analytics).unwrap();

    let result = process_companies(&orchestrator, &client, TOKEN, &companies_request())
        .await
        .unwrap();

    assert_eq!(result.records.len(), 2);
    assert_eq!(result.records[0].id, "Example_id1");
    assert_eq!(result.records[1].id, "Example_id2");
    assert_eq!(result.outcome_count(), 3);

    let body = crawling_finished_body(&analytics).await;
    assert_eq!(body["task_id"], json!(123));
    assert_eq!(
        body["errors"]["Example_id3"]["error_type"],
        json!("UnsupportedInputError")
    );
    assert_eq!(body["errors"].as_object().unwrap().len(), 1);
}

#[tokio::test]
async fn test_feed_raw_data_payload() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(&platform, SCRAPER_AGENT, two_companies()).await;

    Mock::given(method("POST"))
        .and(path("/feed-raw-data"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&analytics)
        .await;
    mount_crawling_finished(&analytics).await;

    let orchestrator = create_orchestrator(&platform, &analytics);
    let client = AnalyticsClient::new(&orchestrator.config().analytics).unwrap();
    process_companies(&orchestrator, &client, TOKEN, &companies_request())
        .await
        .unwrap();

    let requests = analytics.received_requests().await.unwrap();
    let feeds: Vec<Value> = requests
        .iter()
        .filter(|r| r.url.path() == "/feed-raw-data")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect();

    assert_eq!(feeds.len(), 2);
    assert_eq!(feeds[0]["company_id"], json!("Example_id1"));
    assert_eq!(feeds[0]["source_name"], json!("linkedin"));
    assert_eq!(feeds[0]["raw_data"]["id"], json!("Example_id1"));
    assert_eq!(feeds[0]["raw_data"]["name"], json!("Langfuse"));
    assert_eq!(feeds[0]["raw_data"]["follower_count"], json!(null));
}

#[tokio::test]
async fn test_unknown_company_is_not_an_error() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(&platform, SCRAPER_AGENT, two_companies()).await;

    Mock::given(method("POST"))
        .and(path("/feed-raw-data"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&analytics)
        .await;
    mount_crawling_finished(&analytics).await;

    let orchestrator = create_orchestrator(&platform, &analytics);
    let client = AnalyticsClient::new(&orchestrator.config().analytics).unwrap();

    let result = process_companies(&orchestrator, &client, TOKEN, &companies_request())
        .await
        .unwrap();

    assert_eq!(result.records.len(), 2);
    assert!(result.errors.get("Example_id1").is_none());
    assert!(result.errors.get("Example_id2").is_none());
}

#[tokio::test]
async fn test_feed_failure_is_recorded_per_company() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(&platform, SCRAPER_AGENT, two_companies()).await;

    Mock::given(method("POST"))
        .and(path("/feed-raw-data"))
        .and(body_partial_json(json!({"company_id": "Example_id2"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .mount(&analytics)
        .await;
    Mock::given(method("POST"))
        .and(path("/feed-raw-data"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&analytics)
        .await;
    mount_crawling_finished(&analytics).await;

    let orchestrator = create_orchestrator(&platform, &analytics);
    let client = AnalyticsClient::new(&orchestrator.config().analytics).unwrap();

    let result = process_companies(&orchestrator, &client, TOKEN, &companies_request())
        .await
        .unwrap();

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].id, "Example_id1");
    assert_eq!(result.outcome_count(), 3);
    let entry = result.errors.get("Example_id2").unwrap();
    assert_eq!(entry.error_type, ErrorKind::AnalyticsError);
    assert!(entry.error_description.contains("500"));

    let body = crawling_finished_body(&analytics).await;
    assert_eq!(
        body["errors"]["Example_id2"]["error_type"],
        json!("AnalyticsError")
    );
}

#[tokio::test]
async fn test_general_failure_is_reported_to_analytics() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(&platform, SCRAPER_AGENT, json!([])).await;

    Mock::given(method("POST"))
        .and(path("/feed-raw-data"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&analytics)
        .await;
    mount_crawling_finished(&analytics).await;

    let orchestrator = create_orchestrator(&platform, &analytics);
    let client = AnalyticsClient::new(&orchestrator.config().analytics).unwrap();

    let result = process_companies(&orchestrator, &client, TOKEN, &companies_request())
        .await
        .unwrap();

    assert!(result.records.is_empty());
    let body = crawling_finished_body(&analytics).await;
    assert_eq!(body["errors"]["GENERAL"]["error_type"], json!("CrawlingError"));
    assert!(body["errors"]["GENERAL"]["error_description"]
        .as_str()
        .unwrap()
        .contains("cardinality mismatch"));
}

#[tokio::test]
async fn test_crawling_finished_failure() {
    let platform = MockServer::start().await;
    let analytics = MockServer::start().await;
    mount_platform(&platform, SCRAPER_AGENT, two_companies()).await;

    Mock::given(method("POST"))
        .and(path("/feed-raw-data"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&analytics)
        .await;
    Mock::given(method("POST"))
        .and(path("/crawling-finished"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&analytics)
        .await;

    let orchestrator = create_orchestrator(&platform, &analytics);
    let client = AnalyticsClient::new(&orchestrator.config().analytics).unwrap();

    let result = process_companies(&orchestrator, &client, TOKEN, &companies_request()).await;

    assert!(matches!(
        result,
        Err(AnalyticsError::Status { status: 503, .. })
    ));
}

#[tokio::test]
async fn test_register_measurements() {
    let analytics = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/source-measurement"))
        .and(header("authorization", "Bearer analytics-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 17})))
        .mount(&analytics)
        .await;

    let client = AnalyticsClient::new(&company_miner::config::AnalyticsConfig {
        base_url: analytics.uri(),
    })
    .unwrap();
    let mut map = NormalizationMap::company("linkedin");

    let registered = register_measurements(&client, TOKEN, &mut map, "5")
        .await
        .unwrap();

    assert_eq!(registered.len(), map.mappings.len());
    assert!(map
        .mappings
        .iter()
        .all(|m| m.source_measurement_id.as_deref() == Some("17")));

    let requests = analytics.received_requests().await.unwrap();
    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        first,
        json!({
            "source_module_id": "5",
            "type": "text",
            "measurement_name": "company name"
        })
    );
}

#[tokio::test]
async fn test_register_nested_measurements() {
    let analytics = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/source-measurement"))
        .and(body_partial_json(json!({"measurement_name": "headquarters"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "hq"})))
        .mount(&analytics)
        .await;
    Mock::given(method("POST"))
        .and(path("/source-measurement"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "leaf"})))
        .mount(&analytics)
        .await;

    let client = AnalyticsClient::new(&company_miner::config::AnalyticsConfig {
        base_url: analytics.uri(),
    })
    .unwrap();
    let mut headquarters = FieldMapping::new("headquarters", "nested", "headquarters");
    headquarters.nested_mappings = vec![FieldMapping::new("city", "text", "headquarter city")];
    let mut map = NormalizationMap {
        source: "linkedin".to_string(),
        mappings: vec![headquarters],
    };

    let registered = register_measurements(&client, TOKEN, &mut map, "5")
        .await
        .unwrap();

    assert_eq!(registered.len(), 2);
    assert_eq!(registered[1].parent_measurement_id.as_deref(), Some("hq"));
    assert_eq!(
        map.mappings[0].nested_mappings[0]
            .source_measurement_id
            .as_deref(),
        Some("leaf")
    );
}

#[tokio::test]
async fn test_register_measurements_failure() {
    let analytics = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/source-measurement"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1})))
        .mount(&analytics)
        .await;

    let client = AnalyticsClient::new(&company_miner::config::AnalyticsConfig {
        base_url: analytics.uri(),
    })
    .unwrap();
    let mut map = NormalizationMap::company("linkedin");

    let result = register_measurements(&client, TOKEN, &mut map, "5").await;

    // Only 201 Created counts as a registration
    assert!(matches!(
        result,
        Err(AnalyticsError::Status { status: 200, .. })
    ));
}
