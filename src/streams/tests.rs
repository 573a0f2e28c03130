//! Tests for the stream catalog and resource listing

use super::*;
use crate::http::HttpClientConfig;
use crate::types::BackoffType;
use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(server.uri())
        .max_retries(1)
        .backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(10),
        )
        .no_rate_limit()
        .build();
    HttpClient::with_config(config).unwrap()
}

fn context<'a>(client: &'a HttpClient, reports: &'a [ReportDefinition]) -> StreamContext<'a> {
    StreamContext {
        client,
        network_id: "1",
        reports,
        reconcile: ReconcileConfig::default(),
    }
}

async fn mount_two_order_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/networks/1/orders"))
        .and(query_param("page_token", "t2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [{"orderId": "3"}]
        })))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/networks/1/orders"))
        .and(query_param_is_missing("page_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [{"orderId": "1"}, {"orderId": "2"}],
            "nextPageToken": "t2"
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_lister_follows_page_tokens_in_order() {
    let server = MockServer::start().await;
    mount_two_order_pages(&server).await;

    let client = client_for(&server);
    let lister = ResourceLister::new(&client, "1");
    let records: Vec<JsonValue> = lister.list("orders").try_collect().await.unwrap();

    assert_eq!(
        records,
        vec![
            json!({"orderId": "1"}),
            json!({"orderId": "2"}),
            json!({"orderId": "3"})
        ]
    );
}

#[tokio::test]
async fn test_lister_is_lazy() {
    let server = MockServer::start().await;
    mount_two_order_pages(&server).await;

    let client = client_for(&server);
    let lister = ResourceLister::new(&client, "1");
    let records = lister.list("orders");

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());

    let records: Vec<JsonValue> = records.try_collect().await.unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_lister_restarts_from_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/networks/1/placements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "placements": [{"name": "networks/1/placements/9"}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let lister = ResourceLister::new(&client, "1");

    let first: Vec<JsonValue> = lister.list("placements").try_collect().await.unwrap();
    let second: Vec<JsonValue> = lister.list("placements").try_collect().await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_lister_missing_field_yields_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/networks/1/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records: Vec<JsonValue> = ResourceLister::new(&client, "1")
        .list("reports")
        .try_collect()
        .await
        .unwrap();

    assert!(records.is_empty());
}

#[tokio::test]
async fn test_lister_stops_when_token_repeats() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/networks/1/placements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "placements": [{"placementId": "1"}],
            "nextPageToken": "stuck"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let records: Vec<JsonValue> = ResourceLister::new(&client, "1")
        .list("placements")
        .try_collect()
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_lister_failed_page_ends_stream() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/networks/1/orders"))
        .and(query_param("page_token", "t2"))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/networks/1/orders"))
        .and(query_param_is_missing("page_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [{"orderId": "1"}],
            "nextPageToken": "t2"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let items: Vec<Result<JsonValue>> = ResourceLister::new(&client, "1")
        .list("orders")
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &json!({"orderId": "1"}));
    assert!(matches!(
        items[1],
        Err(Error::HttpStatus { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_orders_stream_reads_all_pages() {
    let server = MockServer::start().await;
    mount_two_order_pages(&server).await;

    let client = client_for(&server);
    let stream = ListingStream::orders();
    let mut sink: Vec<JsonValue> = Vec::new();
    let count = stream.read(&context(&client, &[]), &mut sink).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(sink[2]["orderId"], "3");
}

#[tokio::test]
async fn test_report_results_without_definitions_makes_no_requests() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let mut sink: Vec<JsonValue> = Vec::new();
    let count = ReportResultsStream
        .read(&context(&client, &[]), &mut sink)
        .await
        .unwrap();

    assert_eq!(count, 0);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[test]
fn test_catalog_declarations() {
    let streams = catalog();
    let names: Vec<&str> = streams.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["orders", "placements", "reports", "report_results"]);

    let orders = &streams[0];
    assert_eq!(orders.key_properties(), vec!["orderId".to_string()]);
    assert_eq!(orders.replication_key(), Some("updateTime"));
    assert_eq!(orders.sync_mode(), SyncMode::Incremental);

    let results = &streams[3];
    assert_eq!(results.key_properties(), vec!["result_name".to_string()]);
    assert_eq!(results.replication_key(), None);
    assert_eq!(results.sync_mode(), SyncMode::FullRefresh);
    assert!(results.schema().get_property("rows").is_some());
}

#[test]
fn test_select_streams() {
    assert_eq!(select_streams(&[]).unwrap().len(), 4);

    let selected = select_streams(&["report_results".to_string(), "orders".to_string()]).unwrap();
    let names: Vec<&str> = selected.iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["orders", "report_results"]);

    let err = select_streams(&["line_items".to_string()]).err().unwrap();
    assert!(matches!(err, Error::StreamNotFound { stream } if stream == "line_items"));
}

#[test]
fn test_catalog_entry() {
    let entry = catalog_entry(&ListingStream::orders());
    assert_eq!(entry["tap_stream_id"], "orders");
    assert_eq!(entry["key_properties"], json!(["orderId"]));
    assert_eq!(entry["replication_key"], "updateTime");
    assert_eq!(entry["replication_method"], "INCREMENTAL");
    assert_eq!(entry["schema"]["properties"]["updateTime"]["format"], "date-time");

    let entry = catalog_entry(&ReportResultsStream);
    assert!(entry["replication_key"].is_null());
    assert_eq!(entry["replication_method"], "FULL_TABLE");
}
