/// Outcome of a route admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(String),
}

/// Presence-only gate for restricted paths.
///
/// Only checks that a credential cookie exists. Validity and role are the
/// service's business; this just saves a round trip to a page that would
/// bounce anyway.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    restricted_prefix: String,
    login_path: String,
}

impl RouteGuard {
    pub fn new(restricted_prefix: impl Into<String>, login_path: impl Into<String>) -> Self {
        Self {
            restricted_prefix: restricted_prefix.into(),
            login_path: login_path.into(),
        }
    }

    pub fn is_restricted(&self, path: &str) -> bool {
        path.starts_with(&self.restricted_prefix)
    }

    pub fn check(&self, path: &str, has_credential: bool) -> GuardDecision {
        if !has_credential && self.is_restricted(path) {
            GuardDecision::Redirect(self.login_path.clone())
        } else {
            GuardDecision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_decisions() {
        let guard = RouteGuard::new("/admin", "/login");

        assert_eq!(
            guard.check("/admin/users", false),
            GuardDecision::Redirect("/login".to_string())
        );
        assert_eq!(guard.check("/admin/users", true), GuardDecision::Allow);
        assert_eq!(guard.check("/suppliers", false), GuardDecision::Allow);
        assert_eq!(guard.check("/login", false), GuardDecision::Allow);
    }
}
