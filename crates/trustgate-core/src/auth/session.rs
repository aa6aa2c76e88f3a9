use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{
    ApiError, ApiRequest, AuthError, RequestDispatcher, IDENTITY_PATH, LOGIN_PATH, LOGOUT_PATH,
    REGISTER_PATH,
};
use crate::models::{Credentials, User};
use crate::notify::Notifier;

use super::FailureRouter;

/// Message shown after a successful login
pub const LOGIN_MESSAGE: &str = "Successfully Logged In";

/// What the front end sees of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    /// True until the first identity lookup has finished.
    pub loading: bool,
    /// When the service last confirmed `user`.
    pub verified_at: Option<DateTime<Utc>>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            verified_at: None,
        }
    }
}

/// Current authenticated identity, kept in step with login, refresh and
/// logout. `user` is only ever set from a successful `GET /auth/me`.
pub struct SessionStore {
    dispatcher: RequestDispatcher,
    router: Arc<FailureRouter>,
    notifier: Notifier,
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    pub fn new(dispatcher: RequestDispatcher, router: Arc<FailureRouter>, notifier: Notifier) -> Self {
        let (tx, _) = watch::channel(SessionSnapshot::default());
        Self {
            dispatcher,
            router,
            notifier,
            tx,
        }
    }

    pub fn current_session(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Startup check: ask the service who we are.
    pub async fn restore(&self) -> Option<User> {
        self.fetch_user().await
    }

    /// Identity lookup. Any failure leaves the session empty.
    async fn fetch_user(&self) -> Option<User> {
        let lookup = match self.dispatcher.send(ApiRequest::get(IDENTITY_PATH)).await {
            Ok(response) => response.error_for_status().and_then(|r| r.json::<User>()),
            Err(e) => Err(e),
        };

        match lookup {
            Ok(user) => {
                debug!(user_id = user.id, username = %user.username, role = %user.role, "Identity confirmed");
                self.tx.send_modify(|s| {
                    s.user = Some(user.clone());
                    s.loading = false;
                    s.verified_at = Some(Utc::now());
                });
                // A confirmed identity re-arms the login redirect.
                self.router.reset();
                Some(user)
            }
            Err(e) => {
                debug!(error = %e, "Identity lookup failed");
                self.clear();
                None
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let credentials = Credentials { username, password };
        self.dispatcher
            .send(ApiRequest::post(LOGIN_PATH).json(&credentials)?)
            .await?
            .error_for_status()?;

        let user = self
            .fetch_user()
            .await
            .ok_or(AuthError::IdentityUnavailable)?;

        info!(username = %user.username, "Logged in");
        self.notifier.show(LOGIN_MESSAGE);
        Ok(user)
    }

    /// Create the account, then log in with the same credentials.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, ApiError> {
        let credentials = Credentials { username, password };
        self.dispatcher
            .send(ApiRequest::post(REGISTER_PATH).json(&credentials)?)
            .await?
            .error_for_status()?;

        info!(username = username, "Account created");
        self.login(username, password).await
    }

    /// The local session is cleared and the login redirect issued on every
    /// exit path, including a failed or cancelled remote call. The remote
    /// error, if any, is still returned.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let _cleanup = LogoutGuard { store: self };

        let result = match self.dispatcher.send(ApiRequest::post(LOGOUT_PATH)).await {
            Ok(response) => response.error_for_status().map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(ref e) = result {
            warn!(error = %e, "Remote logout failed, clearing local session anyway");
        }
        result
    }

    /// "Am I still logged in?" Joins any refresh already in flight.
    pub async fn refresh_session(&self) -> Result<Option<User>, ApiError> {
        match self.dispatcher.coordinator().refresh_now().await {
            Ok(()) => Ok(self.fetch_user().await),
            Err(e) => {
                debug!(error = %e, "Session refresh failed");
                self.clear();
                Err(e.into())
            }
        }
    }

    fn clear(&self) {
        self.tx.send_modify(|s| {
            s.user = None;
            s.loading = false;
            s.verified_at = None;
        });
    }
}

struct LogoutGuard<'a> {
    store: &'a SessionStore,
}

impl Drop for LogoutGuard<'_> {
    fn drop(&mut self) {
        self.store.clear();
        self.store.router.redirect_to_login();
        info!("Logged out");
    }
}
