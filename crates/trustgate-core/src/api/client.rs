//! Construction root for the client stack.
//!
//! One `ApiClient` owns the single `RefreshCoordinator` for its transport;
//! nothing about refresh state lives in globals.

use std::sync::Arc;

use crate::auth::{
    FailureRouter, GuardDecision, Navigator, RefreshCoordinator, RouteGuard, SessionStore,
    TracingNavigator,
};
use crate::config::ClientConfig;
use crate::notify::Notifier;

use super::{ApiError, ApiRequest, ApiResponse, HttpTransport, RequestDispatcher, Transport};

/// Everything a front end needs: `send` for data calls, `session()` for
/// identity, plus the route guard.
/// Clone is cheap - every component is shared behind an Arc.
#[derive(Clone)]
pub struct ApiClient {
    transport: HttpTransport,
    dispatcher: RequestDispatcher,
    session: Arc<SessionStore>,
    router: Arc<FailureRouter>,
    guard: RouteGuard,
    credential_cookie: String,
}

impl ApiClient {
    /// Build a client that logs navigations instead of performing them.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_navigator(config, Arc::new(TracingNavigator))
    }

    pub fn with_navigator(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let transport = HttpTransport::new(&config.base_url, config.request_timeout())?;
        let router = Arc::new(FailureRouter::new(navigator, config.login_path.clone()));
        let shared: Arc<dyn Transport> = Arc::new(transport.clone());
        let coordinator = RefreshCoordinator::new(Arc::clone(&shared), Arc::clone(&router));
        let dispatcher = RequestDispatcher::new(shared, coordinator);
        let notifier = Notifier::new(config.notification_duration());
        let session = Arc::new(SessionStore::new(
            dispatcher.clone(),
            Arc::clone(&router),
            notifier,
        ));

        Ok(Self {
            transport,
            dispatcher,
            session,
            router,
            guard: RouteGuard::new(config.restricted_prefix.clone(), config.login_path.clone()),
            credential_cookie: config.credential_cookie.clone(),
        })
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.dispatcher.send(request).await
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn router(&self) -> &FailureRouter {
        &self.router
    }

    pub fn has_credential(&self) -> bool {
        self.transport.has_cookie(&self.credential_cookie)
    }

    /// Admission check for a front-end route.
    pub fn check_route(&self, path: &str) -> GuardDecision {
        self.guard.check(path, self.has_credential())
    }
}
