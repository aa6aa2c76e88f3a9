//! Single request/response exchanges against the remote service.
//!
//! The session credential is an HTTP-only cookie set by the service; the
//! cookie jar attached to the underlying client replays it on every request,
//! so nothing here ever reads or writes it as data.

use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{ApiError, ApiRequest, ApiResponse};

/// One exchange with the remote service. Every call is a suspension point.
pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>>;
}

/// reqwest-backed transport with a shared cookie jar.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidRequest(format!("Invalid base URL {}: {}", base_url, e)))?;

        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(timeout)
            .cookie_provider(Arc::clone(&jar))
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Whether the jar currently holds a cookie with this name for the
    /// service. Presence only; the value is never looked at.
    pub fn has_cookie(&self, name: &str) -> bool {
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return false;
        };
        let Ok(header) = header.to_str() else {
            return false;
        };
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(key, _)| key == name)
    }

    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(&request.path);
        let mut builder = self.client.request(request.method.clone(), &url);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(method = %request.method, url = %url, status = %status, retried = request.retried, "Exchange complete");

        Ok(ApiResponse::new(status, body))
    }
}

impl Transport for HttpTransport {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        self.send(request).boxed()
    }
}
