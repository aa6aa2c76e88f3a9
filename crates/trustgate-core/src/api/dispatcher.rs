use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::auth::RefreshCoordinator;

use super::{ApiError, ApiRequest, ApiResponse, AuthError, Transport};

/// Front door for every call against the service.
///
/// Non-401 responses come back verbatim. A 401 on a request that has not
/// been retried is parked on the refresh coordinator and the caller gets
/// its replay; a second 401 is an `AuthError`.
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    coordinator: Arc<RefreshCoordinator>,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn Transport>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            transport,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = self.transport.execute(&request).await?;

        if !response.is_unauthorized() || request.is_credential_exchange() {
            return Ok(response);
        }

        if request.retried {
            warn!(method = %request.method, path = %request.path, "Rejected again after refresh");
            return Err(AuthError::RetryRejected.into());
        }

        debug!(method = %request.method, path = %request.path, "Unauthorized, waiting on session refresh");
        let replayed = self.coordinator.on_auth_failure(request).wait().await?;

        // The replay carried `retried = true`, so a 401 here is final.
        if replayed.is_unauthorized() {
            warn!("Replayed request was rejected again");
            return Err(AuthError::RetryRejected.into());
        }
        Ok(replayed)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(ApiRequest::get(path)).await?;
        response.error_for_status()?.json()
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(ApiRequest::post(path).json(body)?).await?;
        response.error_for_status()?.json()
    }
}
