//! In-process transport fake for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt};
use reqwest::StatusCode;
use tokio::sync::Semaphore;

use crate::api::{ApiError, ApiRequest, ApiResponse, Transport, REFRESH_PATH};

type Handler = Box<dyn Fn(&ApiRequest, usize) -> Result<ApiResponse, ApiError> + Send + Sync>;

pub(crate) fn ok(body: &str) -> ApiResponse {
    ApiResponse::new(StatusCode::OK, body.to_string())
}

pub(crate) fn status(status: StatusCode, body: &str) -> ApiResponse {
    ApiResponse::new(status, body.to_string())
}

/// Answers each request with a closure that also receives how many times the
/// same path was called before. Refresh exchanges can be held behind a gate
/// so tests can pile up waiters first.
pub(crate) struct ScriptedTransport {
    handler: Handler,
    calls: Mutex<Vec<ApiRequest>>,
    seen: Mutex<HashMap<String, usize>>,
    gate: Option<Semaphore>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest, usize) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Self::build(Box::new(handler), None)
    }

    /// Like `new`, but refresh exchanges block until `open_gate`.
    pub fn gated<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&ApiRequest, usize) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Self::build(Box::new(handler), Some(Semaphore::new(0)))
    }

    fn build(handler: Handler, gate: Option<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            handler,
            calls: Mutex::new(Vec::new()),
            seen: Mutex::new(HashMap::new()),
            gate,
        })
    }

    pub fn open_gate(&self) {
        if let Some(ref gate) = self.gate {
            gate.add_permits(1);
        }
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|r| r.path).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls().iter().filter(|r| r.path == path).count()
    }

    async fn respond(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        if request.path == REFRESH_PATH {
            if let Some(ref gate) = self.gate {
                // Dropping the permit hands it back, so the gate stays open.
                let _permit = gate.acquire().await.expect("gate closed");
            }
        }

        self.calls.lock().unwrap().push(request.clone());
        let prior = {
            let mut seen = self.seen.lock().unwrap();
            let entry = seen.entry(request.path.clone()).or_insert(0);
            let prior = *entry;
            *entry += 1;
            prior
        };
        (self.handler)(request, prior)
    }
}

impl Transport for ScriptedTransport {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        self.respond(request).boxed()
    }
}
