use super::{Endpoint, UpstreamError, UpstreamTransport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
enum MockResponse {
    Json(Value),
    Status(u16),
    Timeout,
}

/// A request seen by the mock
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Transport that records calls and serves canned responses per endpoint.
/// Unconfigured endpoints answer `{}`.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<HashMap<&'static str, MockResponse>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, endpoint: Endpoint, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.path(), MockResponse::Json(body));
    }

    pub fn fail_with_status(&self, endpoint: Endpoint, status: u16) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.path(), MockResponse::Status(status));
    }

    pub fn fail_with_timeout(&self, endpoint: Endpoint) {
        self.responses
            .lock()
            .unwrap()
            .insert(endpoint.path(), MockResponse::Timeout);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> Vec<RecordedCall> {
        let suffix = format!("/{}", endpoint.path());
        self.calls()
            .into_iter()
            .filter(|call| call.url.ends_with(&suffix))
            .collect()
    }
}

#[async_trait]
impl UpstreamTransport for MockTransport {
    async fn get_json(&self, url: &str, params: &[(&'static str, String)]) -> Result<Value, UpstreamError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            params: params
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone()))
                .collect(),
        });

        let path = url.rsplit('/').next().unwrap_or_default();
        let response = self.responses.lock().unwrap().get(path).cloned();

        match response {
            Some(MockResponse::Json(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(UpstreamError::Status {
                status,
                url: url.to_string(),
            }),
            Some(MockResponse::Timeout) => Err(UpstreamError::Timeout(format!(
                "operation timed out: {}",
                url
            ))),
            None => Ok(json!({})),
        }
    }
}
