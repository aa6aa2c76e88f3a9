//! REST API access for the trust service.
//!
//! This module provides the `ApiClient` construction root and the layers it
//! wires together: a cookie-carrying `Transport`, and the
//! `RequestDispatcher` that recovers expired sessions transparently.
//!
//! The service authenticates with an HTTP-only session cookie issued by
//! `POST /auth/login` and renewed by `POST /auth/refresh`.

pub mod client;
pub mod dispatcher;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use client::ApiClient;
pub use dispatcher::RequestDispatcher;
pub use error::{ApiError, AuthError};
pub use request::{ApiRequest, IDENTITY_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH, REGISTER_PATH};
pub use response::ApiResponse;
pub use transport::{HttpTransport, Transport};
