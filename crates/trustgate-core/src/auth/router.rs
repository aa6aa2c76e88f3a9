use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

/// Hook into whatever performs navigation for the front end.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Default navigator when no front end is attached: logs the navigation.
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, path: &str) {
        info!(path = path, "Navigating to login");
    }
}

/// Sends the user to the login entry point when the session is gone.
///
/// Only the first `redirect_to_login` after construction (or after `reset`)
/// navigates; concurrent and repeated calls are no-ops.
pub struct FailureRouter {
    navigator: Arc<dyn Navigator>,
    login_path: String,
    redirected: AtomicBool,
}

impl FailureRouter {
    pub fn new(navigator: Arc<dyn Navigator>, login_path: impl Into<String>) -> Self {
        Self {
            navigator,
            login_path: login_path.into(),
            redirected: AtomicBool::new(false),
        }
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn redirect_to_login(&self) {
        if self
            .redirected
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Login redirect already issued");
            return;
        }
        self.navigator.navigate(&self.login_path);
    }

    /// Re-arm after the user has authenticated again.
    pub fn reset(&self) {
        self.redirected.store(false, Ordering::Release);
    }

    pub fn has_redirected(&self) -> bool {
        self.redirected.load(Ordering::Acquire)
    }
}
