//! Data models shared with the front end.
//!
//! - `User`: the identity returned by `GET /auth/me`
//! - `Role`: the service-side role (`ADMIN` or `VIEWER`)
//! - `Credentials`: the body of login and register exchanges

pub mod user;

pub use user::{Credentials, Role, User};
