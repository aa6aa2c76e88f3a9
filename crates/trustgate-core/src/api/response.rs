use bytes::Bytes;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::ApiError;

/// Status and raw body of one exchange, kept exactly as the service sent them.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "{} ({})",
                e,
                ApiError::truncate_body(&self.text())
            ))
        })
    }

    /// Return self for 2xx, otherwise the classified error.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.text()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Supplier {
        name: String,
    }

    #[test]
    fn test_json_decode() {
        let response = ApiResponse::new(StatusCode::OK, r#"{"name":"Acme"}"#);
        let supplier: Supplier = response.json().expect("decode");
        assert_eq!(supplier.name, "Acme");

        let broken = ApiResponse::new(StatusCode::OK, "not json");
        assert!(matches!(
            broken.json::<Supplier>(),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_error_for_status_keeps_body() {
        let response = ApiResponse::new(StatusCode::BAD_REQUEST, "User already exists");
        match response.error_for_status() {
            Err(ApiError::Validation { status, body }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body, "User already exists");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
