//! Session-aware client for the trust service.
//!
//! Requests go through [`api::RequestDispatcher`]; a 401 parks them behind a
//! single refresh exchange and replays them once the session is renewed.
//! [`auth::SessionStore`] tracks who is logged in.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod notify;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, AuthError};
pub use auth::{GuardDecision, Navigator, SessionSnapshot};
pub use config::ClientConfig;
pub use models::{Role, User};
