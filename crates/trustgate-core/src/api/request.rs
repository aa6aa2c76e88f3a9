use reqwest::Method;
use serde::Serialize;

use super::ApiError;

/// Paths of the credential exchanges themselves. A 401 from one of these is
/// an answer (e.g. wrong password), not an expired session.
pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const IDENTITY_PATH: &str = "/auth/me";

const CREDENTIAL_EXCHANGES: [&str; 4] = [LOGIN_PATH, REGISTER_PATH, LOGOUT_PATH, REFRESH_PATH];

/// A single call against the remote service.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    /// Set once the request has been queued behind a session refresh.
    pub retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn is_credential_exchange(&self) -> bool {
        let path = self.path.split('?').next().unwrap_or_default();
        CREDENTIAL_EXCHANGES.contains(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_exchange_detection() {
        assert!(ApiRequest::post(LOGIN_PATH).is_credential_exchange());
        assert!(ApiRequest::post(REFRESH_PATH).is_credential_exchange());
        assert!(ApiRequest::post("/auth/register?role=VIEWER").is_credential_exchange());

        // Identity lookups recover through refresh like any data call
        assert!(!ApiRequest::get(IDENTITY_PATH).is_credential_exchange());
        assert!(!ApiRequest::get("/suppliers").is_credential_exchange());
    }

    #[test]
    fn test_json_body() {
        let request = ApiRequest::post("/suppliers")
            .json(&serde_json::json!({ "name": "Acme" }))
            .expect("encode body");
        assert_eq!(request.body, Some(serde_json::json!({ "name": "Acme" })));
        assert!(!request.retried);
    }
}
