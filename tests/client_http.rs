//! End-to-end tests against a local HTTP server.

use std::time::Duration;

use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fetchkit::{FetchClient, FetchError, PageParams, RecordMapper};

async fn connect(server: &MockServer) -> FetchClient {
    FetchClient::builder()
        .endpoint(server.uri())
        .token("tk_live_test")
        .max_retries(2)
        .backoff(Duration::from_millis(10))
        .probe(false)
        .connect()
        .await
        .unwrap()
}

#[tokio::test]
async fn fetch_returns_mapped_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .and(header("Authorization", "Bearer tk_live_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1,
            "name": "alpha",
            "region": "eu-west-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let mapper = RecordMapper::with_required(["id", "name"]);

    let record = client.fetch("records/1", &mapper).await.unwrap();
    assert_eq!(record.get_i64("id"), Some(1));
    assert_eq!(record.get_str("name"), Some("alpha"));
    assert_eq!(record.get_str("region"), Some("eu-west-1"));
}

#[tokio::test]
async fn fetch_retries_503_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let mapper = RecordMapper::with_required(["id"]);

    let record = client.fetch("records/1", &mapper).await.unwrap();
    assert_eq!(record.get_i64("id"), Some(1));
    assert_eq!(client.metrics().retries, 2);
}

#[tokio::test]
async fn fetch_exhausts_retries_on_persistent_503() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3) // initial try + 2 retries
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let mapper = RecordMapper::new();

    let err = client.fetch("records/1", &mapper).await.unwrap_err();
    match err {
        FetchError::RetryExhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(source.is_transient());
        }
        other => panic!("expected RetryExhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn fetch_does_not_retry_401() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records/1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"message": "invalid token", "type": "auth_error"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let mapper = RecordMapper::new();

    let err = client.fetch("records/1", &mapper).await.unwrap_err();
    match err {
        FetchError::Authentication { message, .. } => {
            assert_eq!(message, "invalid token");
        }
        other => panic!("expected Authentication, got {:?}", other),
    }
}

#[tokio::test]
async fn fetch_all_follows_cursor_chain() {
    let server = MockServer::start().await;

    // Cursor-specific mock first so it wins when the cursor is present.
    Mock::given(method("GET"))
        .and(path("/records"))
        .and(query_param("cursor", "cur_2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"id": 3}],
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"id": 1}, {"id": 2}],
            "next_cursor": "cur_2",
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let mapper = RecordMapper::with_required(["id"]);

    let records = client
        .fetch_all("records", &mapper, PageParams::new())
        .await
        .unwrap();

    let ids: Vec<i64> = records.iter().filter_map(|r| r.get_i64("id")).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn fetch_page_missing_required_field_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "records": [{"name": "no id here"}]
        })))
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let mapper = RecordMapper::with_required(["id"]);

    let err = client
        .fetch_page("records", &mapper, &PageParams::new())
        .await
        .unwrap_err();

    match err {
        FetchError::MalformedResponse { field, .. } => {
            assert_eq!(field.as_deref(), Some("id"));
        }
        other => panic!("expected MalformedResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn connect_probe_accepts_reachable_endpoint() {
    let server = MockServer::start().await;

    // No mocks mounted: wiremock answers 404, which still proves the
    // endpoint is reachable.
    let client = FetchClient::builder()
        .endpoint(server.uri())
        .token("tk_live_test")
        .connect()
        .await;

    assert!(client.is_ok());
}

#[tokio::test]
async fn connect_fails_against_unreachable_endpoint() {
    // Nothing listens on this port; keep the retry budget tiny.
    let result = FetchClient::builder()
        .endpoint("http://127.0.0.1:1")
        .token("tk_live_test")
        .max_retries(1)
        .backoff(Duration::from_millis(10))
        .connect()
        .await;

    assert!(matches!(result, Err(FetchError::Connection { .. })));
}
