//! Mock implementations for testing.
//!
//! Provides a mock transport and auth provider for unit testing without
//! making real network calls.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::auth::AuthProvider;
use crate::errors::FetchResult;
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Mock HTTP transport for testing.
pub struct MockTransport {
    responses: Mutex<Vec<MockResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    default_response: Mutex<Option<MockResponse>>,
}

/// A recorded request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Request path.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request headers.
    pub headers: HashMap<String, String>,
}

/// A mock response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl MockResponse {
    /// Creates a successful JSON response.
    pub fn json<T: serde::Serialize>(value: &T) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_default();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status: 200,
            headers,
            body,
        }
    }

    /// Creates an error response with the JSON error envelope.
    pub fn error(status: u16, message: &str) -> Self {
        let error = serde_json::json!({
            "error": {
                "message": message,
                "type": "error"
            }
        });

        let body = serde_json::to_vec(&error).unwrap_or_default();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Self {
            status,
            headers,
            body,
        }
    }

    /// Creates a response with custom status.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            default_response: Mutex::new(None),
        }
    }

    /// Queues a response.
    pub fn queue(&self, response: MockResponse) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push(response);
        }
    }

    /// Queues a JSON response.
    pub fn queue_json<T: serde::Serialize>(&self, value: &T) {
        self.queue(MockResponse::json(value));
    }

    /// Queues an error response.
    pub fn queue_error(&self, status: u16, message: &str) {
        self.queue(MockResponse::error(status, message));
    }

    /// Sets the default response used when the queue is empty.
    pub fn set_default(&self, response: MockResponse) {
        if let Ok(mut default) = self.default_response.lock() {
            *default = Some(response);
        }
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Gets the last recorded request.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests
            .lock()
            .ok()
            .and_then(|r| r.last().cloned())
    }

    /// Clears recorded requests.
    pub fn clear_requests(&self) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.clear();
        }
    }

    /// Returns the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn get_response(&self) -> MockResponse {
        if let Ok(mut responses) = self.responses.lock() {
            if !responses.is_empty() {
                return responses.remove(0);
            }
        }
        self.default_response
            .lock()
            .ok()
            .and_then(|d| d.clone())
            .unwrap_or_else(|| MockResponse::error(500, "No mock response configured"))
    }

    fn record_request(&self, request: &HttpRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method: request.method,
                path: request.path.clone(),
                query: request.query.clone(),
                headers: request.headers.clone(),
            });
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.record_request(&request);

        let response = self.get_response();
        Ok(HttpResponse {
            status: response.status,
            headers: response.headers,
            body: response.body,
        })
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("request_count", &self.request_count())
            .finish()
    }
}

/// Mock auth provider for testing.
pub struct MockAuth {
    token: String,
}

impl MockAuth {
    /// Creates a new mock auth provider.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Default for MockAuth {
    fn default() -> Self {
        Self::new("tk_mock_test_token")
    }
}

#[async_trait]
impl AuthProvider for MockAuth {
    fn apply_auth(&self, headers: &mut HashMap<String, String>) {
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.token),
        );
    }

    fn scheme(&self) -> &str {
        "Bearer"
    }

    fn validate(&self) -> FetchResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for MockAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockAuth").finish()
    }
}

/// Test fixtures for common response payloads.
pub mod fixtures {
    /// A single record with id, name, and an undeclared extra field.
    pub fn record() -> serde_json::Value {
        serde_json::json!({
            "id": 1,
            "name": "alpha",
            "region": "eu-west-1"
        })
    }

    /// A page envelope with a continuation cursor.
    pub fn page_with_cursor(cursor: &str) -> serde_json::Value {
        serde_json::json!({
            "records": [
                {"id": 1, "name": "alpha"},
                {"id": 2, "name": "beta"}
            ],
            "next_cursor": cursor,
            "total": 3
        })
    }

    /// The final page of a listing (no cursor).
    pub fn last_page() -> serde_json::Value {
        serde_json::json!({
            "records": [
                {"id": 3, "name": "gamma"}
            ],
            "total": 3
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_queue() {
        let transport = MockTransport::new();
        transport.queue_json(&serde_json::json!({"test": "value"}));

        let response = transport.send(HttpRequest::get("test")).await.unwrap();

        assert_eq!(response.status, 200);
        assert!(String::from_utf8_lossy(&response.body).contains("value"));
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::new();
        transport.set_default(MockResponse::json(&serde_json::json!({})));

        transport.send(HttpRequest::get("path1")).await.unwrap();
        transport
            .send(HttpRequest::get("path2").with_query("cursor", "abc"))
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "path1");
        assert_eq!(
            requests[1].query,
            vec![("cursor".to_string(), "abc".to_string())]
        );
    }

    #[tokio::test]
    async fn test_mock_transport_error_response() {
        let transport = MockTransport::new();
        transport.queue_error(429, "Rate limit exceeded");

        let response = transport.send(HttpRequest::get("test")).await.unwrap();
        assert_eq!(response.status, 429);
    }
}
