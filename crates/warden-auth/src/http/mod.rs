//! HTTP handlers for the account endpoints.
//!
//! # Available Handlers
//!
//! - [`register_handler`] - `POST /auth/register`
//! - [`login_handler`] - `POST /auth/login`
//! - [`profile_handler`] - `GET /api/profile`
//!
//! [`auth_routes`] mounts all three on a router whose state exposes
//! [`AuthState`](crate::middleware::AuthState) through `FromRef`.

pub mod account;

pub use account::{
    AuthPayload, ProfilePayload, auth_routes, login_handler, profile_handler, register_handler,
};
