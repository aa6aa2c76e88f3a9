//! Session lifecycle: refresh coordination, identity cache, login redirects.
//!
//! This module provides:
//! - `RefreshCoordinator`: single-flight refresh with a FIFO waiter queue
//! - `SessionStore`: current user, login/register/logout/refresh
//! - `FailureRouter`: idempotent "go to login" side effect
//! - `RouteGuard`: presence-only cookie check for restricted paths
//!
//! The credential itself is a cookie owned by the transport and never
//! inspected here.

pub mod coordinator;
pub mod guard;
pub mod router;
pub mod session;

pub use coordinator::{RefreshCoordinator, RefreshState, WaiterHandle};
pub use guard::{GuardDecision, RouteGuard};
pub use router::{FailureRouter, Navigator, TracingNavigator};
pub use session::{SessionSnapshot, SessionStore, LOGIN_MESSAGE};
