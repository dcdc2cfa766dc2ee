//! In-memory transport for tests: scripted responses per route, every request recorded.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use super::request::{ApiRequest, ApiResponse};
use super::transport::Transport;
use super::ApiError;

enum Scripted {
    Respond(StatusCode, Vec<u8>),
    Timeout,
}

type Route = (Method, String);

#[derive(Default)]
pub(crate) struct StubTransport {
    routes: Mutex<HashMap<Route, VecDeque<Scripted>>>,
    sent: Mutex<Vec<ApiRequest>>,
    yield_first: bool,
}

impl StubTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Suspends once before answering, so concurrent callers interleave.
    pub(crate) fn yielding() -> Self {
        Self {
            yield_first: true,
            ..Self::default()
        }
    }

    fn push(&self, method: Method, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, path.to_string()))
            .or_default()
            .push_back(scripted);
    }

    /// Queue one JSON response for `method path`. Queued responses are served in order.
    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        let status = StatusCode::from_u16(status).unwrap();
        self.push(method, path, Scripted::Respond(status, body.to_string().into_bytes()));
    }

    pub(crate) fn respond_bytes(&self, method: Method, path: &str, body: &[u8]) {
        self.push(method, path, Scripted::Respond(StatusCode::OK, body.to_vec()));
    }

    pub(crate) fn respond_timeout(&self, method: Method, path: &str) {
        self.push(method, path, Scripted::Timeout);
    }

    pub(crate) fn sent(&self) -> Vec<ApiRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn sent_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub(crate) fn count(&self, method: Method, path: &str) -> usize {
        self.sent_to(method, path).len()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if self.yield_first {
            tokio::task::yield_now().await;
        }
        self.sent.lock().unwrap().push(request.clone());

        let scripted = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&(request.method.clone(), request.path.clone()))
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Scripted::Respond(status, body)) => Ok(ApiResponse::new(status, body)),
            Some(Scripted::Timeout) => Err(ApiError::Timeout(Duration::from_secs(30))),
            None => Ok(ApiResponse::new(
                StatusCode::NOT_FOUND,
                json!({"message": format!("no stub for {} {}", request.method, request.path)})
                    .to_string(),
            )),
        }
    }
}

/// Body of a successful login/register
pub(crate) fn auth_body(access: &str, refresh: &str) -> Value {
    json!({
        "user": {"id": 1, "fullName": "A", "email": "a@b.com"},
        "accessToken": access,
        "refreshToken": refresh,
    })
}

/// Body of a successful refresh
pub(crate) fn token_body(access: &str, refresh: &str) -> Value {
    json!({"accessToken": access, "refreshToken": refresh})
}
